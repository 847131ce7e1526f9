//! Primitive-level error types.

use thiserror::Error;

use crate::address::AddressError;
use crate::hash::HashError;

/// Errors arising from malformed identifier values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PrimitiveError {
    /// An address could not be parsed.
    #[error(transparent)]
    Address(#[from] AddressError),
    /// A hash could not be parsed.
    #[error(transparent)]
    Hash(#[from] HashError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_address_error() {
        let err: PrimitiveError = AddressError::InvalidLength { expected: 32, got: 1 }.into();
        assert!(matches!(err, PrimitiveError::Address(_)));
    }

    #[test]
    fn wraps_hash_error() {
        let err: PrimitiveError = HashError::InvalidLength { expected: 32, got: 1 }.into();
        assert!(matches!(err, PrimitiveError::Hash(_)));
    }
}
