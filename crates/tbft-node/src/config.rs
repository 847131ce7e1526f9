//! In-code node configuration.
//!
//! No file, environment, or CLI-flag based configuration loading is in
//! scope here; a simulation harness or test builds this directly.

use tbft_primitives::Address;

/// Everything a [`crate::Node`] needs to be constructed.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// The chain this node participates in.
    pub chain_id: String,
    /// This node's own address.
    pub address: Address,
    /// Every validator this node will gossip with, including itself.
    pub peers: Vec<Address>,
    /// The full validator set driving quorum and leader selection. Ordered
    /// identically across all honest nodes.
    pub validator_set: Vec<Address>,
}
