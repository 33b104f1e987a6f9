use iden3_primitives::{
    hash_bytes,
    merkle::{self, EMPTY_NODE_VALUE},
    serde_utils::hex_bytes,
    MerkleProof, PrimitiveError,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::{error::ClientError, signer::SignedClaim};

/// Root hash published by the relay for its own tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootResponse {
    /// The 32-byte root.
    #[serde(with = "hex_bytes")]
    pub root: [u8; 32],
}

/// Roots for one identity: the relay tree root and the identity tree root
/// anchored under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRootResponse {
    /// Current relay tree root.
    #[serde(with = "hex_bytes")]
    pub root: [u8; 32],
    /// Root of the identity's own claim tree.
    #[serde(rename = "idRoot", with = "hex_bytes")]
    pub id_root: [u8; 32],
}

/// Initial keys for a counterfactual identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIdRequest {
    /// Operational public key, authorized to sign claims.
    #[serde(rename = "operationalpk")]
    pub operational_pk: String,
    /// Recovery public key.
    #[serde(rename = "recoverpk")]
    pub recover_pk: String,
    /// Revocation public key.
    #[serde(rename = "revokepk")]
    pub revoke_pk: String,
}

/// Result of counterfactually creating an identity on the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIdResponse {
    /// Address assigned to the identity.
    #[serde(rename = "idaddr")]
    pub id_addr: String,
    /// Proof that the operational key authorization entered the tree.
    #[serde(rename = "proofOfClaim")]
    pub proof_of_claim: ProofOfClaim,
}

/// Receipt for a relay-side deployment of the identity's contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployIdResponse {
    /// Address of the deployed identity.
    #[serde(rename = "idaddr")]
    pub id_addr: String,
    /// Transaction hash of the deployment.
    pub tx: String,
}

/// Relay acknowledgement for a submitted claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostClaimResponse {
    /// Proof of the freshly inserted claim, when the relay returns one.
    #[serde(rename = "proofOfClaim", default)]
    pub proof_of_claim: Option<ProofOfClaim>,
}

/// Proof for one claim, as served by `get_claim_by_hi`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimByHiResponse {
    /// The full proof bundle for the claim.
    #[serde(rename = "proofOfClaim")]
    pub proof_of_claim: ProofOfClaim,
}

/// Request to bind a human-readable name to an identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindIdRequest {
    /// Address of the identity being bound.
    #[serde(rename = "idAddr")]
    pub id_addr: String,
    /// The requested name.
    pub name: String,
    /// Operational public key of the identity.
    #[serde(rename = "ksignpk")]
    pub ksign_pk: String,
    /// Signature over the address and name by the operational key.
    #[serde(rename = "signatureHex")]
    pub signature_hex: String,
}

/// Confirmation of a name binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindIdResponse {
    /// The bound name.
    pub name: String,
    /// Address of the identity the name resolves to.
    #[serde(rename = "idAddr")]
    pub id_addr: String,
}

/// A single compressed proof against one tree root.
///
/// Carried inside [`ProofOfClaim`]; the wire form is all hex strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClaimProof {
    /// Hex form of the 128-byte leaf. Absent on non-inclusion proofs.
    #[serde(default)]
    pub leaf: Option<String>,
    /// The compressed proof, bitmap plus transmitted siblings.
    pub proof: MerkleProof,
    /// Root the proof commits to.
    #[serde(with = "hex_bytes")]
    pub root: [u8; 32],
    /// Index hash fixing the leaf's path.
    #[serde(with = "hex_bytes")]
    pub hi: [u8; 32],
}

impl ClaimProof {
    /// Verifies this proof as an inclusion proof of its leaf: the leaf
    /// value hash is the hash of the transmitted leaf bytes.
    ///
    /// # Errors
    /// Returns [`PrimitiveError::Format`] when no leaf is attached, the
    /// leaf hex is invalid, or the proof itself is malformed.
    pub fn verify_inclusion(&self, num_levels: usize) -> Result<bool, PrimitiveError> {
        let leaf_hex = self.leaf.as_ref().ok_or(PrimitiveError::Format {
            attribute: "leaf",
            reason: "inclusion proof carries no leaf".to_string(),
        })?;
        let leaf = hex::decode(leaf_hex.trim_start_matches("0x")).map_err(|e| {
            PrimitiveError::Format {
                attribute: "leaf",
                reason: format!("invalid hex encoding: {e}"),
            }
        })?;
        let ht = hash_bytes(&leaf);
        merkle::verify(&self.root, &self.proof, &self.hi, &ht, num_levels)
    }

    /// Verifies this proof as a non-inclusion proof: the leaf value hash
    /// is the canonical empty node.
    ///
    /// # Errors
    /// Returns [`PrimitiveError::Format`] when the proof is malformed.
    pub fn verify_non_inclusion(&self, num_levels: usize) -> Result<bool, PrimitiveError> {
        merkle::verify(&self.root, &self.proof, &self.hi, &EMPTY_NODE_VALUE, num_levels)
    }
}

/// Complete proof that a claim is currently valid under the relay's
/// published root: inclusion of the claim in the identity tree, inclusion
/// of the identity's root in the relay tree, and non-inclusion of the
/// revocation entries for both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProofOfClaim {
    /// Inclusion of the claim in the identity's tree.
    pub claim_proof: ClaimProof,
    /// Inclusion of the identity's root in the relay tree.
    pub set_root_claim_proof: ClaimProof,
    /// Non-inclusion of the claim's revocation entry.
    pub claim_non_revocation_proof: ClaimProof,
    /// Non-inclusion of the root claim's revocation entry.
    pub set_root_claim_non_revocation_proof: ClaimProof,
}

impl ProofOfClaim {
    /// Verifies all four component proofs against their roots.
    ///
    /// Returns `Ok(false)` as soon as any component fails to reproduce its
    /// root; a malformed component surfaces as an error instead.
    ///
    /// # Errors
    /// Returns [`PrimitiveError::Format`] for malformed component proofs.
    pub fn verify(&self, num_levels: usize) -> Result<bool, PrimitiveError> {
        for proof in [&self.claim_proof, &self.set_root_claim_proof] {
            if !proof.verify_inclusion(num_levels)? {
                return Ok(false);
            }
        }
        for proof in [
            &self.claim_non_revocation_proof,
            &self.set_root_claim_non_revocation_proof,
        ] {
            if !proof.verify_non_inclusion(num_levels)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// HTTP client for a relay deployment.
///
/// All methods are plain request/response calls; retry and backoff policy
/// belongs to the caller (see [`ClientError::is_recoverable`]).
#[derive(Debug, Clone)]
pub struct RelayClient {
    base_url: String,
    http: reqwest::Client,
}

impl RelayClient {
    /// Creates a client for the relay at `base_url`.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Fetches the current relay tree root.
    ///
    /// # Errors
    /// Returns [`ClientError::Http`] on transport failures and
    /// [`ClientError::Relay`] on non-success responses.
    pub async fn get_root(&self) -> Result<RootResponse, ClientError> {
        self.get(&format!("{}/root", self.base_url)).await
    }

    /// Fetches the roots for one identity's tree.
    ///
    /// # Errors
    /// See [`Self::get_root`].
    pub async fn get_id_root(&self, id_addr: &str) -> Result<IdRootResponse, ClientError> {
        self.get(&format!("{}/ids/{id_addr}/root", self.base_url))
            .await
    }

    /// Counterfactually creates an identity from its three initial keys.
    /// The relay answers with the assigned address and the proof that the
    /// operational key authorization entered the new tree.
    ///
    /// # Errors
    /// See [`Self::get_root`].
    pub async fn create_id(
        &self,
        operational_pk: &str,
        recover_pk: &str,
        revoke_pk: &str,
    ) -> Result<CreateIdResponse, ClientError> {
        let body = CreateIdRequest {
            operational_pk: operational_pk.to_string(),
            recover_pk: recover_pk.to_string(),
            revoke_pk: revoke_pk.to_string(),
        };
        self.post(&format!("{}/ids", self.base_url), &body).await
    }

    /// Asks the relay to deploy the identity's contract.
    ///
    /// # Errors
    /// See [`Self::get_root`].
    pub async fn deploy_id(&self, id_addr: &str) -> Result<DeployIdResponse, ClientError> {
        self.post(&format!("{}/ids/{id_addr}/deploy", self.base_url), &())
            .await
    }

    /// Submits a signed claim to the identity's tree.
    ///
    /// # Errors
    /// See [`Self::get_root`].
    pub async fn post_claim(
        &self,
        id_addr: &str,
        claim: &SignedClaim,
    ) -> Result<PostClaimResponse, ClientError> {
        self.post(&format!("{}/ids/{id_addr}/claims", self.base_url), claim)
            .await
    }

    /// Fetches the proof bundle for a claim by its index hash.
    ///
    /// # Errors
    /// See [`Self::get_root`].
    pub async fn get_claim_by_hi(
        &self,
        id_addr: &str,
        hi: &[u8; 32],
    ) -> Result<ClaimByHiResponse, ClientError> {
        let hi_hex = format!("0x{}", hex::encode(hi));
        self.get(&format!(
            "{}/ids/{id_addr}/claims/{hi_hex}/proof",
            self.base_url
        ))
        .await
    }

    /// Binds a human-readable name to an identity through the relay's name
    /// resolver.
    ///
    /// # Errors
    /// See [`Self::get_root`].
    pub async fn bind_id(&self, request: &BindIdRequest) -> Result<BindIdResponse, ClientError> {
        self.post(&format!("{}/names", self.base_url), request).await
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, ClientError> {
        debug!(%url, "relay GET");
        let response = self.http.get(url).send().await?;
        Self::decode(response).await
    }

    async fn post<B, T>(&self, url: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(%url, "relay POST");
        let response = self.http.post(url).json(body).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Relay {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }
}
