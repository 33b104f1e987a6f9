use std::{collections::HashMap, fmt, sync::LazyLock};

use crate::{entry::ELEMENT_LEN, hash_bytes, Entry, PrimitiveError};

mod authorize_ksign;
mod basic;

pub use authorize_ksign::AuthorizeKSign;
pub use basic::Basic;

/// Byte width of a claim type discriminant.
pub const CLAIM_TYPE_LEN: usize = 8;

/// Offset of the discriminant inside element 3.
pub(crate) const CLAIM_TYPE_OFFSET: usize = ELEMENT_LEN - CLAIM_TYPE_LEN;

/// An 8-byte claim type discriminant.
///
/// Derived as the last eight bytes of the Keccak-256 hash of the claim's
/// canonical ASCII type name, and embedded at a fixed offset of element 3
/// of every entry so a generic decoder can dispatch on it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClaimType([u8; CLAIM_TYPE_LEN]);

impl ClaimType {
    /// Derives the discriminant for a canonical claim type name.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let digest = hash_bytes(name.as_bytes());
        let mut tag = [0u8; CLAIM_TYPE_LEN];
        tag.copy_from_slice(&digest[32 - CLAIM_TYPE_LEN..]);
        Self(tag)
    }

    /// Wraps raw discriminant bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; CLAIM_TYPE_LEN]) -> Self {
        Self(bytes)
    }

    /// The raw discriminant bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; CLAIM_TYPE_LEN] {
        &self.0
    }

    /// Reads the discriminant embedded in an entry.
    #[must_use]
    pub fn of_entry(entry: &Entry) -> Self {
        let mut tag = [0u8; CLAIM_TYPE_LEN];
        tag.copy_from_slice(&entry.element(3)[CLAIM_TYPE_OFFSET..]);
        Self(tag)
    }
}

impl fmt::Debug for ClaimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClaimType(0x{})", hex::encode(self.0))
    }
}

impl fmt::Display for ClaimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// A claim from the closed set of known variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// Authorization of a public key to sign on behalf of the identity.
    AuthorizeKSign(AuthorizeKSign),
    /// Free-form claim with caller-defined index and data windows.
    Basic(Basic),
}

impl Claim {
    /// The discriminant of this claim's variant.
    #[must_use]
    pub fn claim_type(&self) -> ClaimType {
        match self {
            Self::AuthorizeKSign(_) => AuthorizeKSign::claim_type(),
            Self::Basic(_) => Basic::claim_type(),
        }
    }

    /// Encodes the claim into its leaf representation.
    ///
    /// # Errors
    /// Returns [`PrimitiveError::Format`] when a field does not fit its
    /// reserved byte window.
    pub fn encode(&self) -> Result<Entry, PrimitiveError> {
        match self {
            Self::AuthorizeKSign(claim) => claim.encode(),
            Self::Basic(claim) => Ok(claim.encode()),
        }
    }
}

type DecodeFn = fn(&Entry) -> Result<Claim, PrimitiveError>;

/// Registered decoders keyed by discriminant, resolved once on first use.
static REGISTRY: LazyLock<HashMap<[u8; CLAIM_TYPE_LEN], DecodeFn>> = LazyLock::new(|| {
    let mut decoders: HashMap<[u8; CLAIM_TYPE_LEN], DecodeFn> = HashMap::new();
    decoders.insert(*AuthorizeKSign::claim_type().as_bytes(), |entry| {
        AuthorizeKSign::decode(entry).map(Claim::AuthorizeKSign)
    });
    decoders.insert(*Basic::claim_type().as_bytes(), |entry| {
        Basic::decode(entry).map(Claim::Basic)
    });
    decoders
});

/// Decodes an arbitrary entry by dispatching on its embedded discriminant.
///
/// # Errors
/// Returns [`PrimitiveError::UnknownClaimType`] when the discriminant is
/// not registered, or the variant decoder's error when the entry's fields
/// are malformed.
pub fn decode_entry(entry: &Entry) -> Result<Claim, PrimitiveError> {
    let tag = ClaimType::of_entry(entry);
    let decode = REGISTRY
        .get(tag.as_bytes())
        .ok_or(PrimitiveError::UnknownClaimType(*tag.as_bytes()))?;
    decode(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_type_is_stable_across_calls() {
        let a = ClaimType::from_name("iden3.claim.authorize_k_sign");
        let b = ClaimType::from_name("iden3.claim.authorize_k_sign");
        assert_eq!(a, b);
    }

    #[test]
    fn test_claim_type_is_last_8_bytes_of_name_hash() {
        let digest = hash_bytes(b"iden3.claim.authorize_k_sign");
        let tag = ClaimType::from_name("iden3.claim.authorize_k_sign");
        let expected: [u8; 8] = digest[24..32].try_into().unwrap();
        assert_eq!(*tag.as_bytes(), expected);
    }

    #[test]
    fn test_distinct_names_get_distinct_discriminants() {
        assert_ne!(
            ClaimType::from_name("iden3.claim.authorize_k_sign"),
            ClaimType::from_name("iden3.claim.basic")
        );
    }

    #[test]
    fn test_registry_dispatches_on_embedded_tag() {
        let claim = AuthorizeKSign {
            version: 7,
            sign: true,
            ax: [0x11; 16],
            ay: [0u8; 32],
        };
        let entry = claim.encode().unwrap();
        let decoded = decode_entry(&entry).unwrap();
        assert_eq!(decoded, Claim::AuthorizeKSign(claim));

        let basic = Basic {
            version: 1,
            index: [0x22; 50],
            data: [0x33; 62],
        };
        let decoded = decode_entry(&basic.encode()).unwrap();
        assert_eq!(decoded, Claim::Basic(basic));
    }

    #[test]
    fn test_unregistered_tag_is_rejected() {
        let mut e3 = [0u8; ELEMENT_LEN];
        e3[CLAIM_TYPE_OFFSET..].copy_from_slice(ClaimType::from_name("iden3.claim.unheard_of").as_bytes());
        let entry = Entry::new([[0u8; ELEMENT_LEN], [0u8; ELEMENT_LEN], [0u8; ELEMENT_LEN], e3]);
        assert!(matches!(
            decode_entry(&entry),
            Err(PrimitiveError::UnknownClaimType(_))
        ));
    }

    #[test]
    fn test_claim_encode_matches_variant_encode() {
        let claim = AuthorizeKSign {
            version: 0,
            sign: false,
            ax: [0u8; 16],
            ay: [0u8; 32],
        };
        let wrapped = Claim::AuthorizeKSign(claim);
        assert_eq!(wrapped.encode().unwrap(), claim.encode().unwrap());
        assert_eq!(wrapped.claim_type(), AuthorizeKSign::claim_type());
    }
}
