//! Node-level errors.
//!
//! Like [`tbft_consensus::ConsensusEngine`], [`crate::Node`]'s message
//! dispatch never surfaces a peer's bad input as an error — this type
//! covers local misconfiguration only.

use thiserror::Error;
use tbft_primitives::Address;

/// Errors constructing or configuring a node.
#[derive(Debug, Error, PartialEq)]
pub enum NodeError {
    /// The node's own address was not found in its validator set.
    #[error("address {0} is not a member of the configured validator set")]
    NotAValidator(Address),
    /// A validator set must be non-empty for quorum/leader math to make
    /// sense.
    #[error("validator set must not be empty")]
    EmptyValidatorSet,
    /// Signing a locally authored transaction or proposal failed.
    #[error("failed to sign message: {0}")]
    SigningFailed(String),
}

/// Convenience alias.
pub type NodeResult<T> = Result<T, NodeError>;
