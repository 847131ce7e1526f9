//! SHA-256 hashing of raw bytes and of canonically-encoded values.

use serde::Serialize;
use sha2::{Digest, Sha256};
use tbft_primitives::Hash;

use crate::error::CryptoError;

/// Hash raw bytes with SHA-256.
pub fn hash_bytes(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    Hash::from_bytes(bytes)
}

/// Hash a structured value by first serializing it to canonical JSON
/// (lexicographically key-sorted, whitespace-free) and then hashing the
/// resulting bytes. This is the function used everywhere a "hash of a
/// structured value" is needed: state commitments, block header hashes,
/// and transaction roots.
pub fn hash_value<T: Serialize>(value: &T) -> Result<Hash, CryptoError> {
    let canonical = serde_json::to_value(value)
        .and_then(|v| serde_json::to_vec(&v))
        .map_err(|e| CryptoError::Encoding(e.to_string()))?;
    Ok(hash_bytes(&canonical))
}
