//! Serialization utilities for the protocol's hex-string wire forms.
//!
//! Fixed-width byte values travel as `0x`-prefixed hex strings in every
//! relay payload; these helpers keep that encoding consistent across
//! crates.

/// Serialize/deserialize a fixed-size byte array as a `0x`-prefixed hex
/// string.
pub mod hex_bytes {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    /// Serialize a byte array as a `0x`-prefixed hex string.
    ///
    /// # Errors
    /// Propagates serializer errors.
    pub fn serialize<S, const N: usize>(value: &[u8; N], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(value)))
    }

    /// Deserialize a byte array from a hex string (with or without `0x`
    /// prefix).
    ///
    /// # Errors
    /// Fails on invalid hex or a length other than `N` bytes.
    pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let s = s.trim_start_matches("0x");
        let bytes = hex::decode(s).map_err(|e| D::Error::custom(format!("invalid hex: {e}")))?;
        bytes
            .try_into()
            .map_err(|v: Vec<u8>| D::Error::custom(format!("expected {N} bytes, got {}", v.len())))
    }
}
