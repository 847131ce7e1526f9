//! Applies transactions to a [`State`] with nonce and balance checking.

use std::collections::BTreeMap;

use tbft_primitives::Address;

use crate::error::{ExecutionError, ExecutionResult};
use crate::state::State;
use crate::transaction::{verify_transaction, Transaction};

/// Executes transactions against a [`State`], tracking expected nonces
/// independently of the balances they are applied to.
#[derive(Debug, Default, Clone)]
pub struct Executor {
    chain_id: String,
    expected_nonces: BTreeMap<Address, u64>,
}

impl Executor {
    /// Build an executor scoped to a chain id (used for signature checks).
    pub fn new(chain_id: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            expected_nonces: BTreeMap::new(),
        }
    }

    /// The expected next nonce for an address (0 if unseen).
    pub fn expected_nonce(&self, address: &Address) -> u64 {
        self.expected_nonces.get(address).copied().unwrap_or(0)
    }

    /// Clear all tracked nonces back to 0, without touching balances.
    /// Called before re-executing a block's transactions against a
    /// known-good starting state, so replay validation starts from the
    /// same nonce baseline as the original execution.
    pub fn reset_nonces(&mut self) {
        self.expected_nonces.clear();
    }

    /// Apply a single transaction to `state`.
    ///
    /// Verifies the signature, then the nonce, then the balance, in that
    /// order, failing closed on the first violation and leaving `state`
    /// untouched.
    pub fn apply(&mut self, state: &mut State, tx: &Transaction) -> ExecutionResult<()> {
        verify_transaction(tx, &self.chain_id)
            .map_err(|e| ExecutionError::InvalidSignature(e.to_string()))?;

        let from = tx.data.from;
        let expected = self.expected_nonce(&from);
        if tx.data.nonce != expected {
            return Err(ExecutionError::NonceMismatch {
                sender: from,
                expected,
                got: tx.data.nonce,
            });
        }

        let balance = state.balance(&from);
        if balance < tx.data.amount {
            return Err(ExecutionError::InsufficientBalance {
                sender: from,
                balance,
                amount: tx.data.amount,
            });
        }

        state.account_mut(&from).balance -= tx.data.amount;
        state.account_mut(&tx.data.to).balance += tx.data.amount;
        self.expected_nonces.insert(from, expected + 1);

        Ok(())
    }

    /// Apply a batch of transactions in order, stopping at the first
    /// failure. Returns how many transactions were applied before that.
    pub fn apply_all(&mut self, state: &mut State, txs: &[Transaction]) -> ExecutionResult<usize> {
        for (i, tx) in txs.iter().enumerate() {
            if let Err(e) = self.apply(state, tx) {
                tracing::warn!(index = i, error = %e, "transaction rejected during execution");
                return Err(e);
            }
        }
        Ok(txs.len())
    }
}
