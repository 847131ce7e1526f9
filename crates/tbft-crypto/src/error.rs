//! Cryptographic error types.

use thiserror::Error;

/// Errors arising from key handling, signing, or verification.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// A private key could not be parsed.
    #[error("invalid private key")]
    InvalidPrivateKey,
    /// A public key (address) could not be parsed as a valid Ed25519 point.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    /// The signature bytes were not a well-formed Ed25519 signature.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    /// Verification ran but the signature did not match.
    #[error("signature verification failed")]
    VerificationFailed,
    /// The envelope's domain did not match the expected domain.
    #[error("domain mismatch: expected {expected}, got {got}")]
    DomainMismatch {
        /// Expected domain.
        expected: String,
        /// Domain found on the envelope.
        got: String,
    },
    /// The envelope's chain id did not match the expected chain id.
    #[error("chain id mismatch: expected {expected}, got {got}")]
    ChainIdMismatch {
        /// Expected chain id.
        expected: String,
        /// Chain id found on the envelope.
        got: String,
    },
    /// The payload could not be canonically encoded.
    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Result alias for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
