use std::{fmt, str::FromStr};

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

use crate::{hash_bytes, PrimitiveError};

/// Number of 32-byte elements in an entry.
pub const NUM_ELEMENTS: usize = 4;

/// Width of a single entry element in bytes.
pub const ELEMENT_LEN: usize = 32;

/// A claim in its tree-leaf representation: four 32-byte big-endian
/// elements, 128 bytes total.
///
/// Element 3 is the most significant element and carries the claim type
/// discriminant in its last eight bytes; elements 3 and 2 form the index
/// half of the leaf (they determine its position in the tree), elements 1
/// and 0 the value half. Bytes a claim variant does not use are zero,
/// reserved for future fields.
///
/// An entry is immutable once produced; decoding yields a fresh value.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entry {
    elements: [[u8; ELEMENT_LEN]; NUM_ELEMENTS],
}

impl Entry {
    /// Total serialized length in bytes.
    pub const LEN: usize = NUM_ELEMENTS * ELEMENT_LEN;

    /// Builds an entry from its four elements. `elements[3]` is element 3,
    /// the most significant.
    #[must_use]
    pub const fn new(elements: [[u8; ELEMENT_LEN]; NUM_ELEMENTS]) -> Self {
        Self { elements }
    }

    /// Deserializes an entry from exactly 128 bytes, element 3 first.
    ///
    /// # Errors
    /// Returns [`PrimitiveError::Format`] if the input is not exactly
    /// 128 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitiveError> {
        if bytes.len() != Self::LEN {
            return Err(PrimitiveError::Format {
                attribute: "entry",
                reason: format!("expected {} bytes, got {}", Self::LEN, bytes.len()),
            });
        }
        let mut elements = [[0u8; ELEMENT_LEN]; NUM_ELEMENTS];
        for (i, chunk) in bytes.chunks_exact(ELEMENT_LEN).enumerate() {
            elements[NUM_ELEMENTS - 1 - i].copy_from_slice(chunk);
        }
        Ok(Self { elements })
    }

    /// Deserializes an entry from a hex string (with optional `0x` prefix).
    ///
    /// # Errors
    /// Returns [`PrimitiveError::Format`] on invalid hex or a length other
    /// than 128 bytes.
    pub fn from_hex(s: &str) -> Result<Self, PrimitiveError> {
        let s = s.trim_start_matches("0x");
        let bytes = hex::decode(s).map_err(|e| PrimitiveError::Format {
            attribute: "entry",
            reason: format!("invalid hex encoding: {e}"),
        })?;
        Self::from_bytes(&bytes)
    }

    /// Returns element `index`, 0 through 3.
    ///
    /// # Panics
    /// Panics if `index` is greater than 3.
    #[must_use]
    pub const fn element(&self, index: usize) -> &[u8; ELEMENT_LEN] {
        &self.elements[index]
    }

    /// Serializes the entry, element 3 first.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        for (i, element) in self.elements.iter().rev().enumerate() {
            out[i * ELEMENT_LEN..(i + 1) * ELEMENT_LEN].copy_from_slice(element);
        }
        out
    }

    /// Hex form of the serialized entry with a `0x` prefix.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }

    /// The index hash `hi`: Keccak-256 over elements 3 and 2.
    ///
    /// This is the 256-bit key that fixes the leaf's root-to-leaf path in
    /// the sparse Merkle tree.
    #[must_use]
    pub fn hi(&self) -> [u8; 32] {
        let mut preimage = [0u8; 2 * ELEMENT_LEN];
        preimage[..ELEMENT_LEN].copy_from_slice(&self.elements[3]);
        preimage[ELEMENT_LEN..].copy_from_slice(&self.elements[2]);
        hash_bytes(&preimage)
    }

    /// The value hash `hv`: Keccak-256 over elements 1 and 0.
    #[must_use]
    pub fn hv(&self) -> [u8; 32] {
        let mut preimage = [0u8; 2 * ELEMENT_LEN];
        preimage[..ELEMENT_LEN].copy_from_slice(&self.elements[1]);
        preimage[ELEMENT_LEN..].copy_from_slice(&self.elements[0]);
        hash_bytes(&preimage)
    }

    /// Keccak-256 over the full 128 bytes: the leaf value hash `ht`
    /// submitted alongside inclusion proofs.
    #[must_use]
    pub fn hash(&self) -> [u8; 32] {
        hash_bytes(&self.to_bytes())
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entry({})", self.to_hex())
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Entry {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Entry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            serializer.serialize_bytes(&self.to_bytes())
        }
    }
}

impl<'de> Deserialize<'de> for Entry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Self::from_hex(&s).map_err(D::Error::custom)
        } else {
            let bytes = Vec::<u8>::deserialize(deserializer)?;
            Self::from_bytes(&bytes).map_err(D::Error::custom)
        }
    }
}
