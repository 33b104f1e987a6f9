use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// External signing provider for claim payloads.
///
/// Key generation and custody are outside this crate. The orchestration
/// layer only needs a signature over an entry's hex form and the public
/// key it was produced with; hardware wallets, remote signers and plain
/// software keys all fit behind this trait.
pub trait ClaimSigner: Send {
    /// Signs `message` and returns the hex-encoded signature.
    ///
    /// # Errors
    /// Returns [`ClientError::Signer`] when the provider cannot produce a
    /// signature.
    fn sign(&self, message: &[u8]) -> Result<String, ClientError>;

    /// Hex form of the public key signatures are produced with.
    fn public_key(&self) -> String;
}

/// A claim ready for submission: the entry's hex form plus the signature
/// authorizing it and the public key that signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedClaim {
    /// Hex form of the 128-byte entry.
    #[serde(rename = "valueHex")]
    pub value_hex: String,
    /// Hex-encoded signature over `value_hex`.
    #[serde(rename = "signatureHex")]
    pub signature_hex: String,
    /// Public key the claim was signed with. Must already be authorized in
    /// the identity's tree.
    #[serde(rename = "ksignpk")]
    pub ksign_pk: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_field_names() {
        let claim = SignedClaim {
            value_hex: "0x00".to_string(),
            signature_hex: "0x01".to_string(),
            ksign_pk: "0x02".to_string(),
        };
        let json = serde_json::to_string(&claim).unwrap();
        assert_eq!(
            json,
            r#"{"valueHex":"0x00","signatureHex":"0x01","ksignpk":"0x02"}"#
        );
        let back: SignedClaim = serde_json::from_str(&json).unwrap();
        assert_eq!(back, claim);
    }
}
