//! Client-side orchestration for the iden3 identity protocol.
//!
//! This crate wires the byte-exact claim codec and proof verifier from
//! [`iden3_primitives`] to a relay service: an HTTP client for the relay's
//! API, the identity lifecycle built on top of it, nonce replay protection
//! and configuration.
//!
//! Persistence and signing are injected capabilities (see
//! [`store::KeyStore`] and [`signer::ClaimSigner`]); this crate never
//! generates or holds key material itself.
#![deny(clippy::all, clippy::nursery, missing_docs, dead_code)]

/// Client configuration.
pub mod config;

/// Error type shared by the client layer.
pub mod error;

/// Identity lifecycle orchestration against a relay.
pub mod identity;

/// Nonce replay window for relay challenges.
pub mod nonce;

/// HTTP client for the relay service and its wire types.
pub mod relay;

/// Signing seam for claim submission.
pub mod signer;

/// Persistence seam for identity metadata.
pub mod store;

pub use config::Config;
pub use error::ClientError;
pub use identity::Identity;
pub use nonce::NonceDb;
pub use relay::{ClaimProof, ProofOfClaim, RelayClient};
pub use signer::{ClaimSigner, SignedClaim};
pub use store::{KeyStore, MemoryStore};
