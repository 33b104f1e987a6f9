//! This crate contains the byte-exact core of the iden3 identity protocol:
//! the fixed-layout codec that turns typed claims into 128-byte tree leaves
//! and the verifier for the compressed sparse Merkle proofs served by a
//! relay.
//!
//! Everything here is pure and synchronous over immutable byte buffers.
//! Network access, persistence and signing live in the client crate.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(clippy::all, clippy::nursery, missing_docs, dead_code)]

use alloy_primitives::Keccak256;

/// Typed claims, their entry codecs and the claim type registry.
pub mod claim;

/// The 128-byte leaf container shared by every claim variant.
pub mod entry;

/// Compressed sparse Merkle proof parsing and verification.
pub mod merkle;

pub mod serde_utils;

pub use claim::{decode_entry, AuthorizeKSign, Basic, Claim, ClaimType};
pub use entry::Entry;
pub use merkle::{verify, MerkleProof, EMPTY_NODE_VALUE};

/// Hashes arbitrary bytes with Keccak-256.
///
/// This is the hash behind claim type discriminants, entry index/value
/// hashes and every tree node recomputed during proof verification. It has
/// to match the function the relay used when building the tree.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Decodes a hex string (with optional `0x` prefix) into a fixed-size byte
/// array.
///
/// # Errors
/// Returns [`PrimitiveError::Format`] if the input is not valid hex or does
/// not decode to exactly `N` bytes; `attribute` names the offending value
/// in the error.
pub fn bytes_from_hex<const N: usize>(
    s: &str,
    attribute: &'static str,
) -> Result<[u8; N], PrimitiveError> {
    let s = s.trim_start_matches("0x");
    let bytes = hex::decode(s).map_err(|e| PrimitiveError::Format {
        attribute,
        reason: format!("invalid hex encoding: {e}"),
    })?;
    bytes.try_into().map_err(|v: Vec<u8>| PrimitiveError::Format {
        attribute,
        reason: format!("expected {N} bytes, got {}", v.len()),
    })
}

/// Errors surfaced by the codec and proof layers.
///
/// A proof that is well formed but fails to reproduce its root is not an
/// error; verification reports that as an ordinary `false`.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum PrimitiveError {
    /// Input bytes do not fit the fixed layout they are meant for. Raised
    /// for wrong field widths, malformed proof bytes and out-of-range
    /// parameters; never papered over by truncating or padding.
    #[error("format error at {attribute}: {reason}")]
    Format {
        /// The field or buffer that was rejected.
        attribute: &'static str,
        /// Why the input was rejected.
        reason: String,
    },
    /// The claim type discriminant embedded in an entry is not registered.
    #[error("unknown claim type 0x{}", hex::encode(.0))]
    UnknownClaimType(
        /// The unrecognized discriminant bytes.
        [u8; 8],
    ),
    /// An entry carries a different claim type than the decoder expects.
    #[error("claim type mismatch: expected 0x{}, got 0x{}", hex::encode(.expected), hex::encode(.actual))]
    TypeMismatch {
        /// The discriminant of the variant being decoded.
        expected: [u8; 8],
        /// The discriminant actually embedded in the entry.
        actual: [u8; 8],
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_bytes_is_deterministic() {
        let a = hash_bytes(b"iden3");
        let b = hash_bytes(b"iden3");
        assert_eq!(a, b);
        assert_ne!(a, hash_bytes(b"iden3 "));
    }

    #[test]
    fn test_bytes_from_hex_accepts_both_prefix_forms() {
        let with: [u8; 4] = bytes_from_hex("0xdeadbeef", "value").unwrap();
        let without: [u8; 4] = bytes_from_hex("deadbeef", "value").unwrap();
        assert_eq!(with, [0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(with, without);
    }

    #[test]
    fn test_bytes_from_hex_rejects_wrong_length() {
        let err = bytes_from_hex::<4>("0xdead", "value").unwrap_err();
        assert!(matches!(
            err,
            PrimitiveError::Format {
                attribute: "value",
                ..
            }
        ));
    }

    #[test]
    fn test_bytes_from_hex_rejects_non_hex() {
        assert!(bytes_from_hex::<4>("0xzzzzzzzz", "value").is_err());
    }
}
