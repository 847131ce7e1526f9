//! The narrow interface a node uses to exchange messages with its peers.

use tbft_primitives::Address;

use crate::message::NetMessage;

/// Point-to-point and broadcast message delivery. Delivery is best-effort:
/// a transport may drop, delay, duplicate, or reorder messages, and none of
/// that surfaces as an error here — a node is expected to tolerate it by
/// construction (idempotent vote/proposal handling, pull-based body
/// retrieval), not by retrying.
pub trait Transport {
    /// Send a message to a single peer.
    fn send(&mut self, sender: Address, receiver: Address, message: NetMessage);

    /// Send a message to every peer in `receivers` except `sender` itself.
    fn broadcast(&mut self, sender: Address, receivers: &[Address], message: NetMessage) {
        for &receiver in receivers {
            if receiver != sender {
                self.send(sender, receiver, message.clone());
            }
        }
    }

    /// Drain and return every message currently queued for `receiver`.
    fn get_messages(&mut self, receiver: Address) -> Vec<NetMessage>;
}
