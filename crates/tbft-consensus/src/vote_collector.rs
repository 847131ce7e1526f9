//! Per-height/round/type vote tallying.

use std::collections::{HashMap, HashSet};

use tbft_primitives::{Address, Hash};

use crate::validator_set::ValidatorSet;
use crate::votes::{voter, Vote, VoteType};

/// Tracks, per `(height, round, vote_type)`, the set of addresses that
/// voted for each distinct block hash (or nil). A validator may appear
/// under more than one `block_hash` entry at the same key — this collector
/// records equivocating votes rather than rejecting them, so each hash a
/// validator voted for can independently accumulate towards its own
/// quorum. Detecting and punishing the equivocation itself is a separate
/// concern this core does not implement (no slashing).
#[derive(Debug, Default)]
pub struct VoteCollector {
    votes: HashMap<(u64, u32, VoteType), HashMap<Option<Hash>, HashSet<Address>>>,
}

impl VoteCollector {
    /// An empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a vote. Returns `true` if this vote was newly recorded (this
    /// address had not yet voted for this exact block hash at this
    /// height/round/type), and `false` if it was an exact duplicate. A
    /// vote for a different hash than one this address already cast at
    /// the same key is recorded independently, not rejected.
    pub fn add_vote(&mut self, vote: &Vote) -> bool {
        let key = (vote.data.height, vote.data.round, vote.data.vote_type);
        let by_hash = self.votes.entry(key).or_default();
        by_hash.entry(vote.data.block_hash).or_default().insert(voter(vote))
    }

    /// Count of recorded votes for a specific block hash (or nil, if
    /// `block_hash` is `None`) at a given height/round/type.
    pub fn count_for(&self, height: u64, round: u32, vote_type: VoteType, block_hash: Option<Hash>) -> usize {
        self.votes
            .get(&(height, round, vote_type))
            .and_then(|m| m.get(&block_hash))
            .map(HashSet::len)
            .unwrap_or(0)
    }

    /// If some non-nil block hash has reached quorum at this
    /// height/round/type, return it. If more than one (impossible under
    /// honest-majority assumptions but not excluded at the type level),
    /// the first found is returned.
    pub fn quorum_block(
        &self,
        height: u64,
        round: u32,
        vote_type: VoteType,
        validator_set: &ValidatorSet,
    ) -> Option<Hash> {
        let entry = self.votes.get(&(height, round, vote_type))?;
        entry
            .iter()
            .filter_map(|(hash, addrs)| hash.map(|h| (h, addrs.len())))
            .find(|(_, count)| validator_set.has_quorum(*count))
            .map(|(hash, _)| hash)
    }

    /// Total number of votes recorded at a given height/round/type,
    /// including nil votes and, if any validator equivocated, one entry
    /// per distinct hash it voted for.
    pub fn total_votes(&self, height: u64, round: u32, vote_type: VoteType) -> usize {
        self.votes
            .get(&(height, round, vote_type))
            .map(|m| m.values().map(HashSet::len).sum())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tbft_crypto::{Domain, Keypair};
    use crate::votes::VoteData;

    fn vote_for(kp: &Keypair, height: u64, vote_type: VoteType, hash: Option<Hash>) -> Vote {
        Vote::sign(
            Domain::Vote,
            "chain-1",
            VoteData { vote_type, height, round: 0, block_hash: hash },
            kp,
        )
        .unwrap()
    }

    fn validators(n: usize) -> (Vec<Keypair>, ValidatorSet) {
        let kps: Vec<Keypair> = (0..n).map(|i| Keypair::from_seed([i as u8 + 1; 32])).collect();
        let set = ValidatorSet::new(kps.iter().map(Keypair::address).collect());
        (kps, set)
    }

    #[test]
    fn new_vote_is_newly_recorded() {
        let mut collector = VoteCollector::new();
        let kp = Keypair::generate();
        let vote = vote_for(&kp, 1, VoteType::Prevote, Some(Hash::ZERO));
        assert!(collector.add_vote(&vote));
    }

    #[test]
    fn duplicate_vote_is_not_newly_recorded() {
        let mut collector = VoteCollector::new();
        let kp = Keypair::generate();
        let vote = vote_for(&kp, 1, VoteType::Prevote, Some(Hash::ZERO));
        assert!(collector.add_vote(&vote));
        assert!(!collector.add_vote(&vote));
        assert_eq!(collector.count_for(1, 0, VoteType::Prevote, Some(Hash::ZERO)), 1);
    }

    #[test]
    fn equivocating_vote_is_recorded_under_both_hashes() {
        let mut collector = VoteCollector::new();
        let kp = Keypair::generate();
        let hash_a = Hash::from_bytes([1u8; 32]);
        let hash_b = Hash::from_bytes([2u8; 32]);
        let vote_a = vote_for(&kp, 1, VoteType::Prevote, Some(hash_a));
        let vote_b = vote_for(&kp, 1, VoteType::Prevote, Some(hash_b));
        assert!(collector.add_vote(&vote_a));
        assert!(collector.add_vote(&vote_b));
        assert_eq!(collector.count_for(1, 0, VoteType::Prevote, Some(hash_a)), 1);
        assert_eq!(collector.count_for(1, 0, VoteType::Prevote, Some(hash_b)), 1);
    }

    #[test]
    fn equivocating_votes_can_independently_reach_quorum_for_each_hash() {
        let (kps, set) = validators(4);
        let hash_a = Hash::from_bytes([1u8; 32]);
        let hash_b = Hash::from_bytes([2u8; 32]);
        let mut collector = VoteCollector::new();
        // kps[0] equivocates, voting for both hashes.
        collector.add_vote(&vote_for(&kps[0], 1, VoteType::Prevote, Some(hash_a)));
        collector.add_vote(&vote_for(&kps[0], 1, VoteType::Prevote, Some(hash_b)));
        collector.add_vote(&vote_for(&kps[1], 1, VoteType::Prevote, Some(hash_a)));
        collector.add_vote(&vote_for(&kps[2], 1, VoteType::Prevote, Some(hash_a)));
        collector.add_vote(&vote_for(&kps[3], 1, VoteType::Prevote, Some(hash_b)));
        // hash_a has 3 distinct voters -> quorum; hash_b only has 2.
        assert_eq!(collector.quorum_block(1, 0, VoteType::Prevote, &set), Some(hash_a));
        assert_eq!(collector.count_for(1, 0, VoteType::Prevote, Some(hash_b)), 2);
    }

    #[test]
    fn quorum_requires_more_than_two_thirds() {
        let (kps, set) = validators(4);
        let hash = Hash::from_bytes([9u8; 32]);
        let mut collector = VoteCollector::new();
        for kp in &kps[..2] {
            collector.add_vote(&vote_for(kp, 1, VoteType::Prevote, Some(hash)));
        }
        assert!(collector.quorum_block(1, 0, VoteType::Prevote, &set).is_none());
        collector.add_vote(&vote_for(&kps[2], 1, VoteType::Prevote, Some(hash)));
        assert_eq!(collector.quorum_block(1, 0, VoteType::Prevote, &set), Some(hash));
    }

    #[test]
    fn nil_votes_never_reach_quorum() {
        let (kps, set) = validators(4);
        let mut collector = VoteCollector::new();
        for kp in &kps {
            collector.add_vote(&vote_for(kp, 1, VoteType::Prevote, None));
        }
        assert!(collector.quorum_block(1, 0, VoteType::Prevote, &set).is_none());
        assert_eq!(collector.total_votes(1, 0, VoteType::Prevote), 4);
    }
}
