//! Consensus error types.
//!
//! Per the design of this core, none of these are surfaced to an external
//! caller's API for ordinary byzantine/unreliable peer behaviour — a BFT
//! core must tolerate a fraction of malformed or malicious input as
//! routine operation. They exist so internal call sites (and tests) can
//! distinguish *why* a message was dropped; the public engine entry points
//! consume them and turn them into a log line plus a no-op.

use tbft_primitives::{Address, Hash};
use thiserror::Error;

/// Errors that can occur while processing consensus messages.
#[derive(Debug, Error)]
pub enum ConsensusError {
    /// A proposal failed validation.
    #[error("invalid proposal: {0}")]
    InvalidProposal(String),

    /// A vote failed validation.
    #[error("invalid vote from {voter:?}: {reason}")]
    InvalidVote {
        /// The voter's address.
        voter: Address,
        /// Why the vote was rejected.
        reason: String,
    },

    /// The proposal's height did not match the engine's current height.
    #[error("wrong height: expected {expected}, got {got}")]
    WrongHeight {
        /// Expected height.
        expected: u64,
        /// Height found on the message.
        got: u64,
    },

    /// Referenced a block hash the engine has no record of.
    #[error("block not found: {0:?}")]
    BlockNotFound(Hash),

    /// Internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias for consensus operations.
pub type ConsensusResult<T> = Result<T, ConsensusError>;
