//! The wire message catalogue gossiped between nodes.

use serde::{Deserialize, Serialize};
use tbft_consensus::{BlockHeader, Proposal, Vote};
use tbft_primitives::Hash;
use tbft_state::Transaction;

/// Every message kind a node can send or receive. Headers and bodies travel
/// separately so a node can forward a header immediately and let peers pull
/// the body only if they don't already have it; [`NetMessage::Proposal`] is
/// kept as a legacy path that ships header and body together in one message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "message_type")]
pub enum NetMessage {
    /// A signed transaction entering the mempool.
    Transaction(Transaction),
    /// A Prevote or Precommit vote.
    Vote(Vote),
    /// A full, signed block proposal (header + body together).
    Proposal(Proposal),
    /// A block header gossiped ahead of its body.
    BlockHeader(BlockHeader),
    /// A request for the body of a previously-announced header.
    BlockBodyRequest {
        /// Hash of the block whose body is being requested.
        block_hash: Hash,
    },
    /// The transaction body matching a previously-announced header.
    BlockBody {
        /// Hash of the block this body belongs to.
        block_hash: Hash,
        /// The block's transactions, in order.
        transactions: Vec<Transaction>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_body_request_round_trips_through_json() {
        let msg = NetMessage::BlockBodyRequest { block_hash: Hash::from_bytes([3u8; 32]) };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"message_type\":\"BlockBodyRequest\""));
        let back: NetMessage = serde_json::from_str(&json).unwrap();
        match back {
            NetMessage::BlockBodyRequest { block_hash } => assert_eq!(block_hash, Hash::from_bytes([3u8; 32])),
            _ => panic!("wrong variant"),
        }
    }
}
