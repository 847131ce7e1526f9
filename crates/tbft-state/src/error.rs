//! Execution error types.

use tbft_primitives::Address;
use thiserror::Error;

/// Errors that can occur while applying a transaction to a [`crate::State`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExecutionError {
    /// The transaction's signature did not verify.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    /// The transaction's nonce did not match the sender's expected nonce.
    #[error("nonce mismatch for {sender:?}: expected {expected}, got {got}")]
    NonceMismatch {
        /// The sender address.
        sender: Address,
        /// The nonce the executor expected.
        expected: u64,
        /// The nonce actually present on the transaction.
        got: u64,
    },
    /// The sender did not have enough balance to cover the transfer.
    #[error("insufficient balance for {sender:?}: balance {balance}, amount {amount}")]
    InsufficientBalance {
        /// The sender address.
        sender: Address,
        /// The sender's current balance.
        balance: u64,
        /// The amount the transaction attempted to transfer.
        amount: u64,
    },
}

/// Result alias for execution operations.
pub type ExecutionResult<T> = Result<T, ExecutionError>;
