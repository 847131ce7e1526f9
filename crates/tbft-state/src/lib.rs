//! # tbft-state
//!
//! Deterministic account ledger and transaction executor.
//!
//! This crate provides:
//! - [`Account`] / [`State`]: a key/value ledger of balances.
//! - [`Transaction`]: a signed transfer between two addresses.
//! - [`Executor`]: applies transactions to a [`State`], tracking expected
//!   nonces and balance checking.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod executor;
mod state;
mod transaction;

pub use error::{ExecutionError, ExecutionResult};
pub use executor::Executor;
pub use state::{Account, State};
pub use transaction::{tx_hash, verify_transaction, Transaction, TransactionData};
