//! Ed25519 keypairs.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use tbft_primitives::Address;

use crate::error::CryptoError;

/// An Ed25519 signing keypair, with its address derived directly from the
/// public key (no additional hashing indirection).
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a fresh random keypair.
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Construct a keypair from a 32-byte seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// This keypair's address (its Ed25519 public key).
    pub fn address(&self) -> Address {
        public_key_to_address(self.signing_key.verifying_key())
    }

    /// Sign an arbitrary byte buffer, returning the raw 64-byte signature.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

/// Derive the [`Address`] corresponding to an Ed25519 public key.
pub fn public_key_to_address(key: VerifyingKey) -> Address {
    Address::from_bytes(key.to_bytes())
}

/// Verify a raw signature against a message and a signer address.
pub fn verify_signature(
    address: &Address,
    message: &[u8],
    signature: &[u8; 64],
) -> Result<(), CryptoError> {
    let verifying_key = VerifyingKey::from_bytes(address.as_bytes())
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
    let sig = Signature::from_bytes(signature);
    verifying_key
        .verify(message, &sig)
        .map_err(|_| CryptoError::VerificationFailed)
}
