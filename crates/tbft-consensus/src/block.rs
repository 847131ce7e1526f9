//! Blocks and block headers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tbft_primitives::{Address, Hash};
use tbft_state::{tx_hash, Transaction};

/// A block header. `round` is reserved for a future round-advancement
/// extension and is always 0 in this core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// 1-indexed chain height; genesis is height 0.
    pub height: u64,
    /// Hash of the previous block's header.
    pub parent_hash: Hash,
    /// Hash of the resulting account state after applying this block's
    /// transactions.
    pub state_hash: Hash,
    /// Hash of the ordered list of transaction hashes in this block.
    pub tx_root: Hash,
    /// Unix timestamp the proposer attached to this block.
    pub timestamp: u64,
    /// The proposing validator.
    pub proposer: Address,
    /// Reserved for future round-advancement support; always 0 today.
    pub round: u32,
}

/// A block: a header plus the transactions it commits to via `tx_root`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// The block header.
    pub header: BlockHeader,
    /// The transactions included in this block.
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Build the genesis block (height 0) for a set of starting balances.
    pub fn create_genesis(initial_balances: &BTreeMap<Address, u64>) -> Self {
        let state = tbft_state::State::with_balances(initial_balances);
        let header = BlockHeader {
            height: 0,
            parent_hash: Hash::ZERO,
            state_hash: state.hash(),
            tx_root: Hash::ZERO,
            timestamp: 0,
            proposer: Address::ZERO,
            round: 0,
        };
        Self { header, transactions: Vec::new() }
    }

    /// Hash of this block's header. Transactions are committed into the
    /// header via `tx_root`, so they are not separately included here.
    pub fn block_hash(&self) -> Hash {
        tbft_crypto::hash_value(&self.header).expect("BlockHeader always serializes to valid JSON")
    }

    /// Compute the transaction root for a set of transactions: the hash of
    /// the ordered list of their individual transaction hashes.
    pub fn compute_tx_root(transactions: &[Transaction]) -> Hash {
        let hashes: Vec<Hash> = transactions
            .iter()
            .map(|tx| tx_hash(tx).expect("Transaction always serializes to valid JSON"))
            .collect();
        tbft_crypto::hash_value(&hashes).expect("hash list always serializes to valid JSON")
    }
}
