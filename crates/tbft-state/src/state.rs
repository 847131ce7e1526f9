//! The account ledger.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tbft_primitives::{Address, Hash};

/// A single account's balance.
///
/// Expected-next-nonce bookkeeping lives on [`crate::Executor`], not here:
/// it is execution bookkeeping scoped to a chain id, not part of the
/// account state itself, so it is kept out of what gets hashed into
/// [`State::hash`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Account {
    /// Current balance.
    pub balance: u64,
}

/// The full account ledger at a point in the chain.
///
/// Uses a [`BTreeMap`] so the canonical JSON encoding used for hashing is
/// insertion-order independent: serializing a `BTreeMap` always visits
/// keys in sorted order regardless of the order they were inserted in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct State {
    accounts: BTreeMap<Address, Account>,
}

impl State {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger pre-populated with the given starting balances, all
    /// nonces at 0. Used to construct the genesis state.
    pub fn with_balances(balances: &BTreeMap<Address, u64>) -> Self {
        let accounts = balances
            .iter()
            .map(|(addr, balance)| (*addr, Account { balance: *balance }))
            .collect();
        Self { accounts }
    }

    /// Look up an account's balance; unseen addresses have balance 0.
    pub fn balance(&self, address: &Address) -> u64 {
        self.accounts.get(address).map(|a| a.balance).unwrap_or(0)
    }

    /// Borrow an account if it exists.
    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// The number of distinct accounts tracked.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub(crate) fn account_mut(&mut self, address: &Address) -> &mut Account {
        self.accounts.entry(*address).or_default()
    }

    /// Hash of the canonical encoding of this ledger. Two independently
    /// constructed `State`s with the same account values hash identically
    /// regardless of insertion order.
    pub fn hash(&self) -> Hash {
        tbft_crypto::hash_value(self)
            .expect("State always serializes to valid JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::from_bytes([n; 32])
    }

    #[test]
    fn unseen_account_defaults_to_zero() {
        let state = State::new();
        assert_eq!(state.balance(&addr(1)), 0);
    }

    #[test]
    fn with_balances_populates_accounts() {
        let mut balances = BTreeMap::new();
        balances.insert(addr(1), 100);
        balances.insert(addr(2), 50);
        let state = State::with_balances(&balances);
        assert_eq!(state.balance(&addr(1)), 100);
        assert_eq!(state.balance(&addr(2)), 50);
    }

    #[test]
    fn hash_is_insertion_order_independent() {
        let mut b1 = BTreeMap::new();
        b1.insert(addr(1), 10);
        b1.insert(addr(2), 20);

        let s1 = State::with_balances(&b1);
        let mut s2 = State::new();
        // Insert in the opposite order via account_mut.
        s2.account_mut(&addr(2)).balance = 20;
        s2.account_mut(&addr(1)).balance = 10;

        assert_eq!(s1.hash(), s2.hash());
    }

    #[test]
    fn hash_changes_with_balance() {
        let mut balances = BTreeMap::new();
        balances.insert(addr(1), 10);
        let s1 = State::with_balances(&balances);
        balances.insert(addr(1), 11);
        let s2 = State::with_balances(&balances);
        assert_ne!(s1.hash(), s2.hash());
    }

    #[test]
    fn account_count_tracks_distinct_addresses() {
        let mut balances = BTreeMap::new();
        balances.insert(addr(1), 10);
        balances.insert(addr(2), 10);
        let state = State::with_balances(&balances);
        assert_eq!(state.account_count(), 2);
    }
}
