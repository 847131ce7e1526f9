//! Validator / account addresses.
//!
//! An [`Address`] is the raw 32-byte Ed25519 public key of its owner,
//! base64-encoded wherever it appears on the wire or in hashed payloads.
//! This core has no separate "hash of the public key" indirection — the
//! address *is* the public key.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Number of bytes in an [`Address`] (an Ed25519 public key).
pub const ADDRESS_LEN: usize = 32;

/// A 32-byte Ed25519 public key identifying a validator or account.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; ADDRESS_LEN]);

/// Errors that can occur while parsing an [`Address`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    /// The base64 payload did not decode.
    #[error("invalid base64: {0}")]
    InvalidBase64(String),
    /// The decoded payload was not exactly [`ADDRESS_LEN`] bytes.
    #[error("invalid address length: expected {expected}, got {got}")]
    InvalidLength {
        /// Expected byte length.
        expected: usize,
        /// Actual byte length.
        got: usize,
    },
}

impl Address {
    /// The all-zero address. Used as a sentinel, never a real signer.
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    /// Build an address directly from its raw bytes.
    pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Build an address from a byte slice, failing if the length is wrong.
    pub fn from_slice(slice: &[u8]) -> Result<Self, AddressError> {
        if slice.len() != ADDRESS_LEN {
            return Err(AddressError::InvalidLength {
                expected: ADDRESS_LEN,
                got: slice.len(),
            });
        }
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Parse an address from its standard base64 encoding.
    pub fn from_base64(s: &str) -> Result<Self, AddressError> {
        let bytes = BASE64
            .decode(s)
            .map_err(|e| AddressError::InvalidBase64(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Encode this address as standard base64.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// True if this is the zero sentinel address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base64())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_base64())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_base64(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(n: u8) -> Address {
        Address::from_bytes([n; ADDRESS_LEN])
    }

    #[test]
    fn zero_is_zero() {
        assert!(Address::ZERO.is_zero());
        assert!(!sample(1).is_zero());
    }

    #[test]
    fn from_slice_rejects_wrong_length() {
        let err = Address::from_slice(&[1, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            AddressError::InvalidLength { expected: 32, got: 3 }
        );
    }

    #[test]
    fn base64_roundtrip() {
        let addr = sample(0x42);
        let encoded = addr.to_base64();
        let decoded = Address::from_base64(&encoded).unwrap();
        assert_eq!(addr, decoded);
    }

    #[test]
    fn from_base64_rejects_garbage() {
        assert!(Address::from_base64("not base64!!!").is_err());
    }

    #[test]
    fn from_base64_rejects_wrong_length() {
        let short = BASE64.encode([1u8; 10]);
        let err = Address::from_base64(&short).unwrap_err();
        assert!(matches!(err, AddressError::InvalidLength { .. }));
    }

    #[test]
    fn display_matches_base64() {
        let addr = sample(9);
        assert_eq!(format!("{}", addr), addr.to_base64());
    }

    #[test]
    fn debug_contains_encoding() {
        let addr = sample(9);
        let debug = format!("{:?}", addr);
        assert!(debug.contains("Address("));
        assert!(debug.contains(&addr.to_base64()));
    }

    #[test]
    fn equality_and_ordering() {
        let a = sample(1);
        let b = sample(1);
        let c = sample(2);
        assert_eq!(a, b);
        assert!(a < c);
    }

    #[test]
    fn serde_roundtrip() {
        let addr = sample(77);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr.to_base64()));
        let decoded: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, decoded);
    }

    #[test]
    fn serde_rejects_bad_length() {
        let json = format!("\"{}\"", BASE64.encode([1u8; 5]));
        let result: Result<Address, _> = serde_json::from_str(&json);
        assert!(result.is_err());
    }

    #[test]
    fn hash_set_dedup() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(sample(1));
        set.insert(sample(1));
        set.insert(sample(2));
        assert_eq!(set.len(), 2);
    }
}
