use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::{
    claim::{ClaimType, CLAIM_TYPE_OFFSET},
    entry::ELEMENT_LEN,
    Entry, PrimitiveError,
};

const TYPE_NAME: &str = "iden3.claim.basic";

/// Byte width of the caller-defined index window.
pub const INDEX_LEN: usize = 50;

/// Byte width of the caller-defined data window.
pub const DATA_LEN: usize = 62;

const INDEX_HIGH: Range<usize> = 0..20;
const VERSION: Range<usize> = 20..24;
const INDEX_LOW: Range<usize> = 2..32;
const DATA_HIGH: Range<usize> = 2..32;

/// Free-form claim carrying caller-defined bytes.
///
/// The index bytes land in elements 3 and 2 and therefore participate in
/// the leaf's tree position; the data bytes land in elements 1 and 0 and
/// only affect its value hash.
///
/// ```text
/// element 3: |index high|version|claim type| - |20|4|8| bytes
/// element 2: |empty|index low|              - |2|30| bytes
/// element 1: |empty|data high|              - |2|30| bytes
/// element 0: |data low|                     - |32| bytes
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Basic {
    /// Version assigned to the claim, big-endian on the wire.
    pub version: u32,
    /// Caller-defined index bytes.
    #[serde(with = "crate::serde_utils::hex_bytes")]
    pub index: [u8; INDEX_LEN],
    /// Caller-defined data bytes.
    #[serde(with = "crate::serde_utils::hex_bytes")]
    pub data: [u8; DATA_LEN],
}

impl Basic {
    /// The discriminant for this claim variant.
    #[must_use]
    pub fn claim_type() -> ClaimType {
        ClaimType::from_name(TYPE_NAME)
    }

    /// Encodes the claim into its leaf representation. Field widths are
    /// fixed by the type, so encoding cannot fail.
    #[must_use]
    pub fn encode(&self) -> Entry {
        let mut e3 = [0u8; ELEMENT_LEN];
        e3[INDEX_HIGH].copy_from_slice(&self.index[..20]);
        e3[VERSION].copy_from_slice(&self.version.to_be_bytes());
        e3[CLAIM_TYPE_OFFSET..].copy_from_slice(Self::claim_type().as_bytes());

        let mut e2 = [0u8; ELEMENT_LEN];
        e2[INDEX_LOW].copy_from_slice(&self.index[20..]);

        let mut e1 = [0u8; ELEMENT_LEN];
        e1[DATA_HIGH].copy_from_slice(&self.data[..30]);

        let mut e0 = [0u8; ELEMENT_LEN];
        e0.copy_from_slice(&self.data[30..]);

        Entry::new([e0, e1, e2, e3])
    }

    /// Decodes the claim from its leaf representation.
    ///
    /// # Errors
    /// Returns [`PrimitiveError::TypeMismatch`] when the embedded
    /// discriminant belongs to a different variant.
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
        let mut version_bytes = [0u8; 4];
        version_bytes.copy_from_slice(&e3[VERSION]);

        let mut index = [0u8; INDEX_LEN];
        index[..20].copy_from_slice(&e3[INDEX_HIGH]);
        index[20..].copy_from_slice(&entry.element(2)[INDEX_LOW]);

        let mut data = [0u8; DATA_LEN];
        data[..30].copy_from_slice(&entry.element(1)[DATA_HIGH]);
        data[30..].copy_from_slice(entry.element(0));

        Ok(Self {
            version: u32::from_be_bytes(version_bytes),
            index,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Basic {
        let mut index = [0u8; INDEX_LEN];
        let mut data = [0u8; DATA_LEN];
        for (i, b) in index.iter_mut().enumerate() {
            *b = i as u8;
        }
        for (i, b) in data.iter_mut().enumerate() {
            *b = 0xff - i as u8;
        }
        Basic {
            version: 42,
            index,
            data,
        }
    }

    #[test]
    fn test_roundtrip() {
        let claim = sample();
        assert_eq!(Basic::decode(&claim.encode()).unwrap(), claim);
    }

    #[test]
    fn test_layout_windows() {
        let claim = sample();
        let entry = claim.encode();

        assert_eq!(&entry.element(3)[0..20], &claim.index[..20]);
        assert_eq!(&entry.element(3)[20..24], &42u32.to_be_bytes());
        assert_eq!(&entry.element(3)[24..32], Basic::claim_type().as_bytes());
        assert_eq!(&entry.element(2)[0..2], &[0u8; 2]);
        assert_eq!(&entry.element(2)[2..32], &claim.index[20..]);
        assert_eq!(&entry.element(1)[0..2], &[0u8; 2]);
        assert_eq!(&entry.element(1)[2..32], &claim.data[..30]);
        assert_eq!(entry.element(0).as_slice(), &claim.data[30..]);
    }

    #[test]
    fn test_index_only_touches_hi() {
        let a = sample();
        let mut b = a;
        b.data[0] ^= 0xff;
        assert_eq!(a.encode().hi(), b.encode().hi());
        assert_ne!(a.encode().hv(), b.encode().hv());
    }

    #[test]
    fn test_decode_rejects_wrong_tag() {
        let entry = super::super::AuthorizeKSign {
            version: 0,
            sign: false,
            ax: [0u8; 16],
            ay: [0u8; 32],
        }
        .encode()
        .unwrap();
        assert!(matches!(
            Basic::decode(&entry),
            Err(PrimitiveError::TypeMismatch { .. })
        ));
    }
}
