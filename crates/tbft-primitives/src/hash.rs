//! Content hashes.
//!
//! A [`Hash`] is a 32-byte SHA-256 digest, rendered as lowercase hex
//! wherever it appears on the wire or inside another hashed/signed value.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Number of bytes in a [`Hash`] (a SHA-256 digest).
pub const HASH_LEN: usize = 32;

/// A 32-byte SHA-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash([u8; HASH_LEN]);

/// Errors that can occur while parsing a [`Hash`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashError {
    /// The hex payload did not decode.
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    /// The decoded payload was not exactly [`HASH_LEN`] bytes.
    #[error("invalid hash length: expected {expected}, got {got}")]
    InvalidLength {
        /// Expected byte length.
        expected: usize,
        /// Actual byte length.
        got: usize,
    },
}

impl Hash {
    /// The all-zero hash. Used as the genesis block's `parent_hash`.
    pub const ZERO: Hash = Hash([0u8; HASH_LEN]);

    /// Build a hash directly from its raw bytes.
    pub fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Build a hash from a byte slice, failing if the length is wrong.
    pub fn from_slice(slice: &[u8]) -> Result<Self, HashError> {
        if slice.len() != HASH_LEN {
            return Err(HashError::InvalidLength {
                expected: HASH_LEN,
                got: slice.len(),
            });
        }
        let mut bytes = [0u8; HASH_LEN];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Parse a hash from its lowercase (or mixed-case) hex encoding.
    pub fn from_hex(s: &str) -> Result<Self, HashError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| HashError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Encode this hash as lowercase hex, no `0x` prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// True if this is the zero sentinel hash.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_LEN]
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
