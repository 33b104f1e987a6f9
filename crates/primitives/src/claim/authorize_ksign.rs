use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::{
    claim::{ClaimType, CLAIM_TYPE_OFFSET},
    entry::ELEMENT_LEN,
    Entry, PrimitiveError,
};

/// Canonical type name; its Keccak-256 hash yields the discriminant.
const TYPE_NAME: &str = "iden3.claim.authorize_k_sign";

// Byte windows inside element 3 (offset 0 = most significant).
const AX: Range<usize> = 3..19;
const SIGN: usize = 19;
const VERSION: Range<usize> = 20..24;

// The `ay` window inside element 2.
const AY: Range<usize> = 16..32;

/// Authorization of an elliptic curve public key to sign claims on behalf
/// of the identity afterwards.
///
/// Element layout, offset 0 most significant:
///
/// ```text
/// element 3: |empty|  ax  |sign|version|claim type| - |3|16|1|4|8| bytes
/// element 2: |   empty    |   ay low half   |       - |16|16| bytes
/// element 1: |empty|                               - |32| bytes
/// element 0: |empty|                               - |32| bytes
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizeKSign {
    /// Version assigned to the claim, big-endian on the wire.
    pub version: u32,
    /// Sign of the x coordinate of the authorized curve point.
    pub sign: bool,
    /// x coordinate of the authorized curve point.
    #[serde(with = "crate::serde_utils::hex_bytes")]
    pub ax: [u8; 16],
    /// y coordinate of the authorized curve point. The layout reserves a
    /// sixteen-byte window, so the high sixteen bytes must be zero.
    #[serde(with = "crate::serde_utils::hex_bytes")]
    pub ay: [u8; 32],
}

impl AuthorizeKSign {
    /// The discriminant for this claim variant.
    #[must_use]
    pub fn claim_type() -> ClaimType {
        ClaimType::from_name(TYPE_NAME)
    }

    /// Encodes the claim into its leaf representation. Every byte outside
    /// the windows above is zero.
    ///
    /// # Errors
    /// Returns [`PrimitiveError::Format`] when `ay` exceeds its
    /// sixteen-byte window; oversize values are rejected, never truncated.
    pub fn encode(&self) -> Result<Entry, PrimitiveError> {
        if self.ay[..16].iter().any(|&b| b != 0) {
            return Err(PrimitiveError::Format {
                attribute: "ay",
                reason: "value exceeds the sixteen-byte window of element 2".to_string(),
            });
        }
        let mut e3 = [0u8; ELEMENT_LEN];
        e3[AX].copy_from_slice(&self.ax);
        e3[SIGN] = u8::from(self.sign);
        e3[VERSION].copy_from_slice(&self.version.to_be_bytes());
        e3[CLAIM_TYPE_OFFSET..].copy_from_slice(Self::claim_type().as_bytes());

        let mut e2 = [0u8; ELEMENT_LEN];
        e2[AY].copy_from_slice(&self.ay[16..]);

        Ok(Entry::new([
            [0u8; ELEMENT_LEN],
            [0u8; ELEMENT_LEN],
            e2,
            e3,
        ]))
    }

    /// Decodes the claim from its leaf representation.
    ///
    /// # Errors
    /// Returns [`PrimitiveError::TypeMismatch`] when the embedded
    /// discriminant belongs to a different variant, and
    /// [`PrimitiveError::Format`] when the sign byte is neither 0 nor 1.
    pub fn decode(entry: &Entry) -> Result<Self, PrimitiveError> {
        let expected = Self::claim_type();
        let actual = ClaimType::of_entry(entry);
        if actual != expected {
            return Err(PrimitiveError::TypeMismatch {
                expected: *expected.as_bytes(),
                actual: *actual.as_bytes(),
            });
        }

        let e3 = entry.element(3);
        let sign = match e3[SIGN] {
            0 => false,
            1 => true,
            other => {
                return Err(PrimitiveError::Format {
                    attribute: "sign",
                    reason: format!("expected 0 or 1, got {other}"),
                })
            }
        };
        let mut version_bytes = [0u8; 4];
        version_bytes.copy_from_slice(&e3[VERSION]);
        let mut ax = [0u8; 16];
        ax.copy_from_slice(&e3[AX]);
        let mut ay = [0u8; 32];
        ay[16..].copy_from_slice(&entry.element(2)[AY]);

        Ok(Self {
            version: u32::from_be_bytes(version_bytes),
            sign,
            ax,
            ay,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AuthorizeKSign {
        let mut ay = [0u8; 32];
        ay[16..].copy_from_slice(&[0xcd; 16]);
        AuthorizeKSign {
            version: 0x0102_0304,
            sign: true,
            ax: [0xab; 16],
            ay,
        }
    }

    #[test]
    fn test_roundtrip() {
        let claim = sample();
        let entry = claim.encode().unwrap();
        assert_eq!(AuthorizeKSign::decode(&entry).unwrap(), claim);
    }

    #[test]
    fn test_roundtrip_boundary_values() {
        for version in [0u32, 1, u32::MAX] {
            for sign in [false, true] {
                let claim = AuthorizeKSign {
                    version,
                    sign,
                    ax: [0u8; 16],
                    ay: [0u8; 32],
                };
                let entry = claim.encode().unwrap();
                assert_eq!(AuthorizeKSign::decode(&entry).unwrap(), claim);
            }
        }
    }

    #[test]
    fn test_layout_windows() {
        let claim = sample();
        let entry = claim.encode().unwrap();
        let e3 = entry.element(3);

        assert_eq!(&e3[0..3], &[0u8; 3]);
        assert_eq!(&e3[3..19], &[0xab; 16]);
        assert_eq!(e3[19], 1);
        assert_eq!(&e3[20..24], &0x0102_0304u32.to_be_bytes());
        assert_eq!(&e3[24..32], AuthorizeKSign::claim_type().as_bytes());

        let e2 = entry.element(2);
        assert_eq!(&e2[0..16], &[0u8; 16]);
        assert_eq!(&e2[16..32], &[0xcd; 16]);

        assert_eq!(entry.element(1), &[0u8; 32]);
        assert_eq!(entry.element(0), &[0u8; 32]);
    }

    #[test]
    fn test_encode_rejects_oversize_ay() {
        let mut claim = sample();
        claim.ay[15] = 1;
        let err = claim.encode().unwrap_err();
        assert!(matches!(
            err,
            PrimitiveError::Format { attribute: "ay", .. }
        ));
    }

    #[test]
    fn test_decode_rejects_wrong_tag() {
        let entry = super::super::Basic {
            version: 0,
            index: [0u8; 50],
            data: [0u8; 62],
        }
        .encode();
        assert!(matches!(
            AuthorizeKSign::decode(&entry),
            Err(PrimitiveError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_invalid_sign_byte() {
        let claim = sample();
        let mut bytes = claim.encode().unwrap().to_bytes();
        bytes[19] = 2;
        let entry = Entry::from_bytes(&bytes).unwrap();
        assert!(matches!(
            AuthorizeKSign::decode(&entry),
            Err(PrimitiveError::Format { attribute: "sign", .. })
        ));
    }

    #[test]
    fn test_serde_roundtrip() {
        let claim = sample();
        let json = serde_json::to_string(&claim).unwrap();
        let back: AuthorizeKSign = serde_json::from_str(&json).unwrap();
        assert_eq!(back, claim);
    }
}
