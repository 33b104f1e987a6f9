use std::collections::HashMap;

use iden3_primitives::{AuthorizeKSign, Basic};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    config::Config,
    error::ClientError,
    relay::{
        BindIdRequest, BindIdResponse, ClaimByHiResponse, CreateIdResponse, DeployIdResponse,
        PostClaimResponse, RelayClient,
    },
    signer::{ClaimSigner, SignedClaim},
    store::KeyStore,
};

/// Key metadata persisted for one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMetadata {
    /// Derivation profile the identity's keys live under.
    #[serde(rename = "keyProfilePath")]
    pub key_profile_path: u32,
    /// Next free derivation index after the initial keys.
    #[serde(rename = "keyPath")]
    pub key_path: u32,
    /// Labelled public keys.
    pub keys: HashMap<String, String>,
}

/// One identity and its orchestration against a relay.
///
/// The identity coordinates the claim codec, the relay API and two
/// injected capabilities: a [`KeyStore`] for metadata persistence and a
/// [`ClaimSigner`] as the signing provider. It never holds key material.
pub struct Identity {
    config: Config,
    relay: RelayClient,
    store: Box<dyn KeyStore>,
    signer: Box<dyn ClaimSigner>,
    recover_pk: String,
    revoke_pk: String,
    id_addr: Option<String>,
    key_profile_path: u32,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("config", &self.config)
            .field("id_addr", &self.id_addr)
            .field("key_profile_path", &self.key_profile_path)
            .finish_non_exhaustive()
    }
}

impl Identity {
    /// Builds an identity from its initial recovery and revocation keys
    /// and the injected capabilities. The operational key comes from the
    /// signing provider.
    #[must_use]
    pub fn new(
        config: Config,
        relay: RelayClient,
        store: Box<dyn KeyStore>,
        signer: Box<dyn ClaimSigner>,
        recover_pk: impl Into<String>,
        revoke_pk: impl Into<String>,
    ) -> Self {
        Self {
            config,
            relay,
            store,
            signer,
            recover_pk: recover_pk.into(),
            revoke_pk: revoke_pk.into(),
            id_addr: None,
            key_profile_path: 0,
        }
    }

    /// Resumes an identity that already has a relay-assigned address.
    #[must_use]
    pub fn with_id_addr(mut self, id_addr: impl Into<String>) -> Self {
        self.id_addr = Some(id_addr.into());
        self
    }

    /// The relay-assigned address, once created.
    #[must_use]
    pub fn id_addr(&self) -> Option<&str> {
        self.id_addr.as_deref()
    }

    /// Creates the identity counterfactually on the relay and persists its
    /// initial key metadata.
    ///
    /// # Errors
    /// Relay and store failures; see [`ClientError`].
    pub async fn create(&mut self) -> Result<CreateIdResponse, ClientError> {
        let response = self
            .relay
            .create_id(
                &self.signer.public_key(),
                &self.recover_pk,
                &self.revoke_pk,
            )
            .await?;
        self.id_addr = Some(response.id_addr.clone());
        self.save_keys()?;
        info!(id_addr = %response.id_addr, "created identity");
        Ok(response)
    }

    /// Asks the relay to deploy the identity's contract.
    ///
    /// # Errors
    /// Fails with [`ClientError::MissingIdAddress`] before `create`, plus
    /// relay failures.
    pub async fn deploy(&self) -> Result<DeployIdResponse, ClientError> {
        let id_addr = self.require_id_addr()?;
        self.relay.deploy_id(id_addr).await
    }

    /// Binds a human-readable name to the identity. The operational key
    /// signs the concatenation of the identity address and the name.
    ///
    /// # Errors
    /// Fails with [`ClientError::MissingIdAddress`] before `create`, plus
    /// signer and relay failures.
    pub async fn bind(&self, name: &str) -> Result<BindIdResponse, ClientError> {
        let id_addr = self.require_id_addr()?.to_string();
        let message = format!("{id_addr}{name}");
        let signature_hex = self.signer.sign(message.as_bytes())?;
        let request = BindIdRequest {
            id_addr,
            name: name.to_string(),
            ksign_pk: self.signer.public_key(),
            signature_hex,
        };
        self.relay.bind_id(&request).await
    }

    /// Encodes, signs and submits a key authorization claim to the
    /// identity's tree.
    ///
    /// # Errors
    /// Codec failures from encoding, plus signer and relay failures.
    pub async fn authorize_ksign(
        &self,
        claim: AuthorizeKSign,
    ) -> Result<PostClaimResponse, ClientError> {
        let entry = claim.encode()?;
        self.submit_entry_hex(entry.to_hex()).await
    }

    /// Encodes, signs and submits a free-form claim to the identity's
    /// tree.
    ///
    /// # Errors
    /// Signer and relay failures.
    pub async fn post_basic_claim(&self, claim: Basic) -> Result<PostClaimResponse, ClientError> {
        self.submit_entry_hex(claim.encode().to_hex()).await
    }

    /// Fetches the proof bundle for one of this identity's claims by its
    /// index hash.
    ///
    /// # Errors
    /// Fails with [`ClientError::MissingIdAddress`] before `create`, plus
    /// relay failures.
    pub async fn claim_proof(&self, hi: &[u8; 32]) -> Result<ClaimByHiResponse, ClientError> {
        let id_addr = self.require_id_addr()?;
        self.relay.get_claim_by_hi(id_addr, hi).await
    }

    /// Persists the identity's key metadata under its store key.
    ///
    /// # Errors
    /// Fails with [`ClientError::MissingIdAddress`] before `create` and
    /// [`ClientError::Store`] when the metadata cannot be encoded.
    pub fn save_keys(&mut self) -> Result<(), ClientError> {
        let id_addr = self.require_id_addr()?.to_string();
        let metadata = KeyMetadata {
            key_profile_path: self.key_profile_path,
            key_path: 4,
            keys: HashMap::from([
                ("operational".to_string(), self.signer.public_key()),
                ("recover".to_string(), self.recover_pk.clone()),
                ("revoke".to_string(), self.revoke_pk.clone()),
            ]),
        };
        let value = serde_json::to_string(&metadata)
            .map_err(|e| ClientError::Store(e.to_string()))?;
        self.store.insert(&Self::keys_store_key(&self.config, &id_addr), value);
        Ok(())
    }

    /// Records a newly derived public key under `label` and bumps the
    /// derivation index. The key itself is produced by the external
    /// provider.
    ///
    /// # Errors
    /// Fails with [`ClientError::MissingKeys`] when `save_keys` has not
    /// run yet, plus store encoding failures.
    pub fn create_key(&mut self, label: &str, public_key: &str) -> Result<(), ClientError> {
        let id_addr = self.require_id_addr()?.to_string();
        let store_key = Self::keys_store_key(&self.config, &id_addr);
        let stored = self
            .store
            .get(&store_key)
            .ok_or(ClientError::MissingKeys(id_addr))?;
        let mut metadata: KeyMetadata =
            serde_json::from_str(&stored).map_err(|e| ClientError::Store(e.to_string()))?;
        metadata.key_path += 1;
        metadata.keys.insert(label.to_string(), public_key.to_string());
        let value = serde_json::to_string(&metadata)
            .map_err(|e| ClientError::Store(e.to_string()))?;
        self.store.insert(&store_key, value);
        Ok(())
    }

    /// All labelled public keys stored for this identity.
    ///
    /// # Errors
    /// Fails with [`ClientError::MissingKeys`] when nothing is stored,
    /// plus store decoding failures.
    pub fn keys(&self) -> Result<HashMap<String, String>, ClientError> {
        let id_addr = self.require_id_addr()?.to_string();
        let stored = self
            .store
            .get(&Self::keys_store_key(&self.config, &id_addr))
            .ok_or(ClientError::MissingKeys(id_addr))?;
        let metadata: KeyMetadata =
            serde_json::from_str(&stored).map_err(|e| ClientError::Store(e.to_string()))?;
        Ok(metadata.keys)
    }

    async fn submit_entry_hex(&self, value_hex: String) -> Result<PostClaimResponse, ClientError> {
        let id_addr = self.require_id_addr()?;
        let signature_hex = self.signer.sign(value_hex.as_bytes())?;
        let signed = SignedClaim {
            value_hex,
            signature_hex,
            ksign_pk: self.signer.public_key(),
        };
        self.relay.post_claim(id_addr, &signed).await
    }

    fn keys_store_key(config: &Config, id_addr: &str) -> String {
        format!("{}:keys:{id_addr}", config.id_prefix())
    }

    fn require_id_addr(&self) -> Result<&str, ClientError> {
        self.id_addr.as_deref().ok_or(ClientError::MissingIdAddress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    struct StaticSigner;

    impl ClaimSigner for StaticSigner {
        fn sign(&self, message: &[u8]) -> Result<String, ClientError> {
            Ok(format!("0x{}", hex::encode(message.len().to_be_bytes())))
        }

        fn public_key(&self) -> String {
            "0x036d94c84a7096c572b83d44df576e1ffb3573123f62099f8d4fa19de806bd4d59"
                .to_string()
        }
    }

    fn test_identity() -> Identity {
        let config = Config::new("http://127.0.0.1:8000");
        let relay = RelayClient::new(config.relay_url());
        Identity::new(
            config,
            relay,
            Box::new(MemoryStore::new()),
            Box::new(StaticSigner),
            "0xrecover",
            "0xrevoke",
        )
        .with_id_addr("0xbc8c480e68d0895f1e410f4e4ea6e2d6b160ca9f")
    }

    #[test]
    fn test_save_keys_then_read_back() {
        let mut identity = test_identity();
        identity.save_keys().unwrap();
        let keys = identity.keys().unwrap();
        assert_eq!(keys.len(), 3);
        assert_eq!(keys.get("recover").map(String::as_str), Some("0xrecover"));
        assert_eq!(keys.get("revoke").map(String::as_str), Some("0xrevoke"));
        assert_eq!(
            keys.get("operational"),
            Some(&StaticSigner.public_key())
        );
    }

    #[test]
    fn test_create_key_records_label_and_bumps_path() {
        let mut identity = test_identity();
        identity.save_keys().unwrap();
        identity.create_key("backup", "0xbackup").unwrap();
        identity.create_key("profile", "0xprofile").unwrap();

        let keys = identity.keys().unwrap();
        assert_eq!(keys.len(), 5);
        assert_eq!(keys.get("backup").map(String::as_str), Some("0xbackup"));

        let stored = identity
            .store
            .get("id:keys:0xbc8c480e68d0895f1e410f4e4ea6e2d6b160ca9f")
            .unwrap();
        let metadata: KeyMetadata = serde_json::from_str(&stored).unwrap();
        assert_eq!(metadata.key_path, 6);
    }

    #[test]
    fn test_create_key_requires_saved_metadata() {
        let mut identity = test_identity();
        assert!(matches!(
            identity.create_key("backup", "0xbackup"),
            Err(ClientError::MissingKeys(_))
        ));
    }

    #[test]
    fn test_operations_require_id_addr() {
        let config = Config::new("http://127.0.0.1:8000");
        let relay = RelayClient::new(config.relay_url());
        let mut identity = Identity::new(
            config,
            relay,
            Box::new(MemoryStore::new()),
            Box::new(StaticSigner),
            "0xrecover",
            "0xrevoke",
        );
        assert!(identity.id_addr().is_none());
        assert!(matches!(
            identity.save_keys(),
            Err(ClientError::MissingIdAddress)
        ));
    }
}
