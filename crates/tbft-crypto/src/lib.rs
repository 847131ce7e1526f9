//! # tbft-crypto
//!
//! Canonical hashing and domain-separated Ed25519 signing for tbft-core.
//!
//! This crate provides:
//! - SHA-256 hashing of raw bytes and of canonically-encoded structured
//!   values ([`hash_bytes`], [`hash_value`]).
//! - Ed25519 keypairs and signing/verification ([`Keypair`]).
//! - A domain- and chain-scoped signed envelope ([`SignedEnvelope`]) that
//!   prevents a signature minted for one message kind or chain from being
//!   replayed as another.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod envelope;
mod error;
mod hash;
mod keys;

pub use envelope::{Domain, SignedEnvelope};
pub use error::CryptoError;
pub use hash::{hash_bytes, hash_value};
pub use keys::{public_key_to_address, Keypair};
