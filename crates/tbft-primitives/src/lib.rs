//! # tbft-primitives
//!
//! Core identifier types shared by every other crate in this workspace:
//!
//! - [`Address`]: a validator/account identity, the base64 encoding of an
//!   Ed25519 public key.
//! - [`Hash`]: a 32-byte SHA-256 digest, hex-encoded on the wire.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod error;
mod hash;

pub use address::Address;
pub use error::PrimitiveError;
pub use hash::Hash;
