//! The relay stores every claim as a leaf of a fixed-depth sparse Merkle
//! tree and serves compressed proofs of inclusion and non-inclusion. Most
//! siblings along a path hash an empty subtree, so a proof transmits a
//! per-level bitmap plus only the non-empty siblings; at the observed
//! protocol depth of 140 this compression is what keeps proofs practical.
//!
//! Verification recomputes the root from the leaf hash and the transmitted
//! siblings and compares it byte for byte against the published root.

use std::{fmt, str::FromStr};

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

use crate::{bytes_from_hex, hash_bytes, PrimitiveError};

/// Width of a tree node hash in bytes.
pub const HASH_LEN: usize = 32;

/// Canonical hash of an empty subtree, identical at every level.
pub const EMPTY_NODE_VALUE: [u8; HASH_LEN] = [0u8; HASH_LEN];

/// Reads bit `bit` of a big-endian buffer; bit 0 is the least significant
/// bit of the last byte and indices grow toward the most significant end.
///
/// # Panics
/// Panics if `bit` addresses a byte past the start of the buffer.
#[must_use]
pub fn get_bit(bytes: &[u8], bit: usize) -> bool {
    let byte = bytes[bytes.len() - 1 - bit / 8];
    (byte >> (bit % 8)) & 1 == 1
}

/// Derives the root-to-leaf traversal directions for a leaf index.
///
/// One entry per level, from level `num_levels - 2` down to 0; `true`
/// descends right, `false` descends left.
#[must_use]
pub fn path_from_index(num_levels: usize, hi: &[u8; HASH_LEN]) -> Vec<bool> {
    (0..num_levels.saturating_sub(1))
        .rev()
        .map(|level| get_bit(hi, level))
        .collect()
}

/// A compressed sparse Merkle proof: a per-level bitmap marking which
/// siblings are transmitted, followed by those siblings in level order.
///
/// A set bit at position `level` of the bitmap means the sibling for that
/// level is carried in the proof; a clear bit stands for
/// [`EMPTY_NODE_VALUE`]. Proofs are transient values parsed from a relay
/// response and consumed by [`verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleProof {
    empties: [u8; HASH_LEN],
    siblings: Vec<[u8; HASH_LEN]>,
}

impl MerkleProof {
    /// Builds a proof from its bitmap and transmitted siblings.
    #[must_use]
    pub const fn new(empties: [u8; HASH_LEN], siblings: Vec<[u8; HASH_LEN]>) -> Self {
        Self { empties, siblings }
    }

    /// Splits raw proof bytes into the bitmap and the sibling list.
    ///
    /// # Errors
    /// Returns [`PrimitiveError::Format`] when the input is shorter than
    /// the 32-byte bitmap or the remainder is not a whole number of
    /// 32-byte siblings.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitiveError> {
        if bytes.len() < HASH_LEN {
            return Err(PrimitiveError::Format {
                attribute: "proof",
                reason: format!("expected at least {HASH_LEN} bytes, got {}", bytes.len()),
            });
        }
        let (head, tail) = bytes.split_at(HASH_LEN);
        if tail.len() % HASH_LEN != 0 {
            return Err(PrimitiveError::Format {
                attribute: "proof",
                reason: format!(
                    "sibling bytes are not whole {HASH_LEN}-byte hashes ({} trailing bytes)",
                    tail.len() % HASH_LEN
                ),
            });
        }
        let mut empties = [0u8; HASH_LEN];
        empties.copy_from_slice(head);
        let siblings = tail
            .chunks_exact(HASH_LEN)
            .map(|chunk| {
                let mut sibling = [0u8; HASH_LEN];
                sibling.copy_from_slice(chunk);
                sibling
            })
            .collect();
        Ok(Self { empties, siblings })
    }

    /// Parses a proof from its hex wire form (with optional `0x` prefix).
    ///
    /// # Errors
    /// Returns [`PrimitiveError::Format`] on invalid hex or malformed
    /// proof bytes.
    pub fn from_hex(s: &str) -> Result<Self, PrimitiveError> {
        let s = s.trim_start_matches("0x");
        let bytes = hex::decode(s).map_err(|e| PrimitiveError::Format {
            attribute: "proof",
            reason: format!("invalid hex encoding: {e}"),
        })?;
        Self::from_bytes(&bytes)
    }

    /// Serializes the proof, bitmap first.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HASH_LEN * (1 + self.siblings.len()));
        out.extend_from_slice(&self.empties);
        for sibling in &self.siblings {
            out.extend_from_slice(sibling);
        }
        out
    }

    /// Hex form of the serialized proof with a `0x` prefix.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }

    /// The per-level bitmap.
    #[must_use]
    pub const fn empties(&self) -> &[u8; HASH_LEN] {
        &self.empties
    }

    /// The transmitted siblings, in level order from the highest level.
    #[must_use]
    pub fn siblings(&self) -> &[[u8; HASH_LEN]] {
        &self.siblings
    }

    /// Number of siblings the bitmap announces for a tree of the given
    /// depth: the population count restricted to levels `0..num_levels-1`.
    fn announced_siblings(&self, num_levels: usize) -> usize {
        (0..num_levels.saturating_sub(1))
            .filter(|&level| get_bit(&self.empties, level))
            .count()
    }
}

impl fmt::Display for MerkleProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for MerkleProof {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for MerkleProof {
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

impl<'de> Deserialize<'de> for MerkleProof {
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

/// Recomputes the Merkle root implied by a leaf and a compressed proof
/// and compares it byte for byte against `root`.
///
/// `hi` fixes the traversal path and `ht` is the leaf value hash. An
/// inclusion proof passes the hash of the actual leaf as `ht`; a
/// non-inclusion proof passes [`EMPTY_NODE_VALUE`]. The fold is identical
/// for both.
///
/// A proof that is well formed but does not reproduce `root` yields
/// `Ok(false)`; the caller branches on that as an ordinary outcome.
///
/// # Errors
/// Returns [`PrimitiveError::Format`] when `num_levels` cannot address a
/// 256-bit index, or when the transmitted sibling count disagrees with
/// the bitmap population for this depth.
pub fn verify(
    root: &[u8; HASH_LEN],
    proof: &MerkleProof,
    hi: &[u8; HASH_LEN],
    ht: &[u8; HASH_LEN],
    num_levels: usize,
) -> Result<bool, PrimitiveError> {
    if num_levels < 2 || num_levels > 8 * HASH_LEN {
        return Err(PrimitiveError::Format {
            attribute: "num_levels",
            reason: format!("tree depth must be between 2 and {}, got {num_levels}", 8 * HASH_LEN),
        });
    }
    let announced = proof.announced_siblings(num_levels);
    if proof.siblings.len() != announced {
        return Err(PrimitiveError::Format {
            attribute: "proof",
            reason: format!(
                "bitmap announces {announced} siblings, {} transmitted",
                proof.siblings.len()
            ),
        });
    }

    let path = path_from_index(num_levels, hi);
    let mut node = *ht;
    let mut next_sibling = 0;
    for level in (0..num_levels - 1).rev() {
        let sibling = if get_bit(&proof.empties, level) {
            let sibling = proof.siblings[next_sibling];
            next_sibling += 1;
            sibling
        } else {
            EMPTY_NODE_VALUE
        };
        node = if path[num_levels - level - 2] {
            hash_node(&sibling, &node)
        } else {
            hash_node(&node, &sibling)
        };
    }
    Ok(node == *root)
}

/// Parses the hex wire forms and verifies. `root`, `hi` and `ht` are
/// 32-byte hex strings, `proof` the bitmap-plus-siblings hex string as
/// transmitted by the relay.
///
/// # Errors
/// Returns [`PrimitiveError::Format`] on any malformed input, with the
/// same structural checks as [`verify`].
pub fn verify_hex(
    root: &str,
    proof: &str,
    hi: &str,
    ht: &str,
    num_levels: usize,
) -> Result<bool, PrimitiveError> {
    let root = bytes_from_hex(root, "root")?;
    let proof = MerkleProof::from_hex(proof)?;
    let hi = bytes_from_hex(hi, "hi")?;
    let ht = bytes_from_hex(ht, "ht")?;
    verify(&root, &proof, &hi, &ht, num_levels)
}

fn hash_node(left: &[u8; HASH_LEN], right: &[u8; HASH_LEN]) -> [u8; HASH_LEN] {
    let mut preimage = [0u8; 2 * HASH_LEN];
    preimage[..HASH_LEN].copy_from_slice(left);
    preimage[HASH_LEN..].copy_from_slice(right);
    hash_bytes(&preimage)
}
