//! The Propose/Prevote/Precommit consensus state machine.

use std::collections::{BTreeMap, HashMap, HashSet};

use tbft_crypto::Keypair;
use tbft_primitives::{Address, Hash};
use tbft_state::{Executor, State};

use crate::block::{Block, BlockHeader};
use crate::error::{ConsensusError, ConsensusResult};
use crate::validator_set::ValidatorSet;
use crate::vote_collector::VoteCollector;
use crate::votes::{proposer, verify_proposal, verify_vote, voter, Proposal, Vote, VoteData, VoteType};

/// Side effects produced by the engine that the caller (a node orchestrator)
/// is responsible for acting on: broadcasting a vote, or recording a
/// finalization.
#[derive(Debug, Clone)]
pub enum ConsensusOutcome {
    /// This validator cast a vote that should be broadcast to its peers.
    Vote(Vote),
    /// A block finalized at this height.
    Finalized {
        /// The finalized height.
        height: u64,
        /// The finalized block's hash.
        block_hash: Hash,
    },
}

/// One validator's view of consensus: Propose -> Prevote -> Precommit.
///
/// No round-advancement or timeout/locking logic is implemented; `round`
/// is always 0. A byzantine or malformed message (bad signature, wrong
/// height, stale nonce) is ordinary operation for a BFT core, not an
/// exceptional one: [`Self::receive_proposal`] and [`Self::receive_vote`]
/// never return an error, they log and discard it.
pub struct ConsensusEngine {
    chain_id: String,
    validator_set: ValidatorSet,
    keypair: Keypair,
    current_height: u64,
    current_state: State,
    executor: Executor,
    /// Finalized blocks, indexed by height; chain[0] is genesis.
    chain: Vec<Block>,
    finalized_heights: HashSet<u64>,
    /// Blocks seen via a proposal but not yet finalized, by height then hash.
    pending_blocks: HashMap<u64, HashMap<Hash, Block>>,
    /// Votes whose referenced block is not yet known, buffered for replay.
    pending_votes: Vec<Vote>,
    vote_collector: VoteCollector,
    prevoted: HashSet<u64>,
    precommitted: HashSet<u64>,
    outbox: Vec<ConsensusOutcome>,
}

impl ConsensusEngine {
    /// Build an engine and immediately initialize it at genesis with the
    /// given starting balances.
    pub fn new(
        chain_id: impl Into<String>,
        validator_set: ValidatorSet,
        keypair: Keypair,
        initial_balances: &BTreeMap<Address, u64>,
    ) -> Self {
        let chain_id = chain_id.into();
        let genesis = Block::create_genesis(initial_balances);
        let current_state = State::with_balances(initial_balances);
        Self {
            executor: Executor::new(chain_id.clone()),
            chain_id,
            validator_set,
            keypair,
            current_height: 1,
            current_state,
            chain: vec![genesis],
            finalized_heights: HashSet::new(),
            pending_blocks: HashMap::new(),
            pending_votes: Vec::new(),
            vote_collector: VoteCollector::new(),
            prevoted: HashSet::new(),
            precommitted: HashSet::new(),
            outbox: Vec::new(),
        }
    }

    /// This validator's own address.
    pub fn address(&self) -> Address {
        self.keypair.address()
    }

    /// The chain id this engine is scoped to.
    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// The height that has not yet been finalized; the next block proposed
    /// will target this height.
    pub fn current_height(&self) -> u64 {
        self.current_height
    }

    /// The validator set driving quorum and leader selection.
    pub fn validator_set(&self) -> &ValidatorSet {
        &self.validator_set
    }

    /// Hash of the most recently finalized block (genesis if nothing else
    /// has finalized yet).
    pub fn last_block_hash(&self) -> Hash {
        self.chain.last().expect("genesis always present").block_hash()
    }

    /// Current account ledger.
    pub fn current_state(&self) -> &State {
        &self.current_state
    }

    /// Number of finalized blocks, including genesis.
    pub fn finalized_count(&self) -> usize {
        self.chain.len()
    }

    /// Drain accumulated outgoing votes / finalization notices.
    pub fn take_outcomes(&mut self) -> Vec<ConsensusOutcome> {
        std::mem::take(&mut self.outbox)
    }

    /// Build a new block proposal from a list of transactions, executing
    /// them against a scratch copy of the current ledger. Does not sign
    /// or broadcast; the caller wraps the result in a signed [`Proposal`].
    pub fn propose_block(
        &self,
        transactions: Vec<tbft_state::Transaction>,
        timestamp: u64,
    ) -> ConsensusResult<Block> {
        let mut scratch_state = self.current_state.clone();
        let mut scratch_executor = self.executor.clone();
        scratch_executor
            .apply_all(&mut scratch_state, &transactions)
            .map_err(|e| ConsensusError::InvalidProposal(e.to_string()))?;

        let tx_root = Block::compute_tx_root(&transactions);
        let header = BlockHeader {
            height: self.current_height,
            parent_hash: self.last_block_hash(),
            state_hash: scratch_state.hash(),
            tx_root,
            timestamp,
            proposer: self.address(),
            round: 0,
        };
        Ok(Block { header, transactions })
    }

    /// Process an incoming proposal. A malformed or invalid proposal (bad
    /// signature, wrong height, bad parent, bad state hash) is logged and
    /// discarded rather than surfaced as an error: a byzantine or merely
    /// out-of-sync peer is ordinary operation for this core.
    pub fn receive_proposal(&mut self, proposal: &Proposal) {
        if let Err(e) = self.try_receive_proposal(proposal) {
            tracing::warn!(error = %e, "rejected proposal");
        }
    }

    fn try_receive_proposal(&mut self, proposal: &Proposal) -> ConsensusResult<()> {
        verify_proposal(proposal, &self.chain_id)
            .map_err(|e| ConsensusError::InvalidProposal(e.to_string()))?;

        let height = proposal.data.height;
        let block = proposal.data.block.clone();
        let block_hash = block.block_hash();

        self.pending_blocks.entry(height).or_default().insert(block_hash, block.clone());

        self.validate_proposal(&block, height, proposal)?;

        tracing::debug!(height, proposer = %proposer(proposal), %block_hash, "accepted proposal");
        self.send_prevote(height, Some(block_hash))?;
        self.process_pending_votes();
        Ok(())
    }

    fn validate_proposal(&self, block: &Block, height: u64, proposal: &Proposal) -> ConsensusResult<()> {
        if height != self.current_height {
            return Err(ConsensusError::WrongHeight { expected: self.current_height, got: height });
        }
        if block.header.parent_hash != self.last_block_hash() {
            return Err(ConsensusError::InvalidProposal("parent hash mismatch".into()));
        }
        if block.header.proposer != proposer(proposal) {
            return Err(ConsensusError::InvalidProposal("proposer mismatch with signer".into()));
        }

        let mut scratch_state = self.current_state.clone();
        let mut scratch_executor = self.executor.clone();
        scratch_executor.reset_nonces();
        scratch_executor
            .apply_all(&mut scratch_state, &block.transactions)
            .map_err(|e| ConsensusError::InvalidProposal(e.to_string()))?;

        if scratch_state.hash() != block.header.state_hash {
            return Err(ConsensusError::InvalidProposal("state hash mismatch".into()));
        }
        Ok(())
    }

    /// Process an incoming vote. An invalid or unverifiable vote is logged
    /// and discarded rather than surfaced as an error, for the same reason
    /// as [`Self::receive_proposal`].
    pub fn receive_vote(&mut self, vote: &Vote) {
        if let Err(e) = self.try_receive_vote(vote) {
            tracing::warn!(error = %e, "rejected vote");
        }
    }

    fn try_receive_vote(&mut self, vote: &Vote) -> ConsensusResult<()> {
        verify_vote(vote, &self.chain_id)
            .map_err(|e| ConsensusError::InvalidVote { voter: voter(vote), reason: e.to_string() })?;

        let height = vote.data.height;
        if let Some(hash) = vote.data.block_hash {
            if !self.block_is_known(height, hash) {
                self.pending_votes.push(vote.clone());
                return Ok(());
            }
        }

        let is_new = self.vote_collector.add_vote(vote);
        if !is_new {
            return Ok(());
        }
        self.check_phase_transitions(height)
    }

    fn block_is_known(&self, height: u64, hash: Hash) -> bool {
        self.pending_blocks.get(&height).map(|m| m.contains_key(&hash)).unwrap_or(false)
            || self.chain.iter().any(|b| b.block_hash() == hash)
    }

    fn process_pending_votes(&mut self) {
        let pending = std::mem::take(&mut self.pending_votes);
        let mut still_pending = Vec::new();
        for vote in pending {
            let known = match vote.data.block_hash {
                None => true,
                Some(hash) => self.block_is_known(vote.data.height, hash),
            };
            if known {
                if let Err(e) = self.try_receive_vote(&vote) {
                    tracing::warn!(error = %e, "rejected buffered vote on replay");
                }
            } else {
                still_pending.push(vote);
            }
        }
        self.pending_votes = still_pending;
    }

    /// Both checks run unconditionally on every call, not as an
    /// if/else-if: a single vote arrival can trigger a Precommit broadcast
    /// and an immediate finalize in the same call, if precommit quorum was
    /// already otherwise reached.
    fn check_phase_transitions(&mut self, height: u64) -> ConsensusResult<()> {
        if let Some(hash) = self.vote_collector.quorum_block(height, 0, VoteType::Prevote, &self.validator_set) {
            if !self.precommitted.contains(&height) {
                self.send_precommit(height, hash)?;
            }
        }
        if let Some(hash) = self.vote_collector.quorum_block(height, 0, VoteType::Precommit, &self.validator_set) {
            self.finalize_block(height, hash)?;
        }
        Ok(())
    }

    /// A validator casts at most one Prevote per height, regardless of
    /// which block it ends up being for.
    fn send_prevote(&mut self, height: u64, block_hash: Option<Hash>) -> ConsensusResult<()> {
        if self.prevoted.contains(&height) {
            return Ok(());
        }
        self.prevoted.insert(height);
        let vote = self.sign_vote(VoteType::Prevote, height, block_hash)?;
        self.outbox.push(ConsensusOutcome::Vote(vote.clone()));
        self.try_receive_vote(&vote)
    }

    /// A validator casts at most one Precommit per height.
    fn send_precommit(&mut self, height: u64, block_hash: Hash) -> ConsensusResult<()> {
        if self.precommitted.contains(&height) {
            return Ok(());
        }
        self.precommitted.insert(height);
        let vote = self.sign_vote(VoteType::Precommit, height, Some(block_hash))?;
        self.outbox.push(ConsensusOutcome::Vote(vote.clone()));
        self.try_receive_vote(&vote)
    }

    fn sign_vote(&self, vote_type: VoteType, height: u64, block_hash: Option<Hash>) -> ConsensusResult<Vote> {
        Vote::sign(
            tbft_crypto::Domain::Vote,
            self.chain_id.clone(),
            VoteData { vote_type, height, round: 0, block_hash },
            &self.keypair,
        )
        .map_err(|e| ConsensusError::Internal(e.to_string()))
    }

    /// Finalizing an already-finalized height is a no-op: a block can only
    /// be finalized once and, once finalized, is never replaced.
    fn finalize_block(&mut self, height: u64, block_hash: Hash) -> ConsensusResult<()> {
        if self.finalized_heights.contains(&height) {
            return Ok(());
        }
        let block = self
            .pending_blocks
            .get(&height)
            .and_then(|m| m.get(&block_hash))
            .cloned()
            .ok_or(ConsensusError::BlockNotFound(block_hash))?;

        self.executor.reset_nonces();
        self.executor
            .apply_all(&mut self.current_state, &block.transactions)
            .map_err(|e| ConsensusError::Internal(e.to_string()))?;

        self.chain.push(block);
        self.finalized_heights.insert(height);
        self.current_height = height + 1;
        tracing::info!(height, %block_hash, "block finalized");
        self.outbox.push(ConsensusOutcome::Finalized { height, block_hash });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::votes::ProposalData;

    fn validator(seed: u8) -> Keypair {
        Keypair::from_seed([seed; 32])
    }

    fn engine_for(
        kp: Keypair,
        validator_set: ValidatorSet,
        balances: &BTreeMap<Address, u64>,
    ) -> ConsensusEngine {
        ConsensusEngine::new("chain-1", validator_set, kp, balances)
    }

    fn four_validators() -> (Vec<Keypair>, ValidatorSet) {
        let kps: Vec<Keypair> = (1..=4).map(validator).collect();
        let set = ValidatorSet::new(kps.iter().map(Keypair::address).collect());
        (kps, set)
    }

    fn sign_proposal(kp: &Keypair, block: Block) -> Proposal {
        Proposal::sign(
            tbft_crypto::Domain::Block,
            "chain-1",
            ProposalData { height: block.header.height, round: 0, block },
            kp,
        )
        .unwrap()
    }

    #[test]
    fn genesis_starts_at_height_one() {
        let (kps, set) = four_validators();
        let engine = engine_for(kps[0].clone(), set, &BTreeMap::new());
        assert_eq!(engine.current_height(), 1);
        assert_eq!(engine.finalized_count(), 1);
    }

    #[test]
    fn full_round_finalizes_with_quorum() {
        let (kps, set) = four_validators();
        let balances = BTreeMap::new();
        let mut leader = engine_for(kps[0].clone(), set.clone(), &balances);

        let block = leader.propose_block(vec![], 1000).unwrap();
        let proposal = sign_proposal(&kps[0], block);

        // Build one engine per validator, all starting from the same genesis.
        let mut engines: Vec<ConsensusEngine> =
            kps.iter().map(|kp| engine_for(kp.clone(), set.clone(), &balances)).collect();

        for engine in engines.iter_mut() {
            engine.receive_proposal(&proposal);
        }
        leader.receive_proposal(&proposal);

        // Gather every prevote produced and feed it to every engine.
        let mut all_votes = Vec::new();
        for engine in engines.iter_mut() {
            for outcome in engine.take_outcomes() {
                if let ConsensusOutcome::Vote(v) = outcome {
                    all_votes.push(v);
                }
            }
        }
        for engine in engines.iter_mut() {
            for vote in &all_votes {
                engine.receive_vote(vote);
            }
        }
        // Precommits produced as a result of prevote quorum.
        let mut precommits = Vec::new();
        for engine in engines.iter_mut() {
            for outcome in engine.take_outcomes() {
                if let ConsensusOutcome::Vote(v) = outcome {
                    precommits.push(v);
                }
            }
        }
        for engine in engines.iter_mut() {
            for vote in &precommits {
                engine.receive_vote(vote);
            }
        }

        for engine in &engines {
            assert_eq!(engine.current_height(), 2);
            assert_eq!(engine.finalized_count(), 2);
        }
    }

    #[test]
    fn rejects_proposal_at_wrong_height() {
        let (kps, set) = four_validators();
        let balances = BTreeMap::new();
        let mut engine = engine_for(kps[0].clone(), set, &balances);
        let mut block = engine.propose_block(vec![], 1).unwrap();
        block.header.height = 99;
        let proposal = sign_proposal(&kps[0], block);
        assert!(engine.try_receive_proposal(&proposal).is_err());
    }

    #[test]
    fn rejects_proposal_with_bad_state_hash() {
        let (kps, set) = four_validators();
        let balances = BTreeMap::new();
        let mut engine = engine_for(kps[0].clone(), set, &balances);
        let mut block = engine.propose_block(vec![], 1).unwrap();
        block.header.state_hash = Hash::from_bytes([0xff; 32]);
        let proposal = sign_proposal(&kps[0], block);
        assert!(engine.try_receive_proposal(&proposal).is_err());
    }

    #[test]
    fn votes_for_unknown_block_are_buffered_then_replayed() {
        let (kps, set) = four_validators();
        let balances = BTreeMap::new();
        let mut engine = engine_for(kps[0].clone(), set, &balances);

        let vote = Vote::sign(
            tbft_crypto::Domain::Vote,
            "chain-1",
            VoteData {
                vote_type: VoteType::Prevote,
                height: 1,
                round: 0,
                block_hash: Some(Hash::from_bytes([7; 32])),
            },
            &kps[1],
        )
        .unwrap();
        engine.receive_vote(&vote);
        assert_eq!(engine.vote_collector.total_votes(1, 0, VoteType::Prevote), 0);
        assert_eq!(engine.pending_votes.len(), 1);
    }

    #[test]
    fn duplicate_vote_resubmission_does_not_double_count() {
        let (kps, set) = four_validators();
        let balances = BTreeMap::new();
        let mut leader = engine_for(kps[0].clone(), set.clone(), &balances);
        let block = leader.propose_block(vec![], 1).unwrap();
        let proposal = sign_proposal(&kps[0], block);

        let mut engine = engine_for(kps[1].clone(), set, &balances);
        engine.receive_proposal(&proposal);
        let prevote = engine
            .take_outcomes()
            .into_iter()
            .find_map(|o| match o {
                ConsensusOutcome::Vote(v) => Some(v),
                _ => None,
            })
            .unwrap();

        engine.receive_vote(&prevote);
        engine.receive_vote(&prevote);
        let block_hash = prevote.data.block_hash;
        assert_eq!(engine.vote_collector.count_for(1, 0, VoteType::Prevote, block_hash), 1);
    }

    #[test]
    fn finalize_is_idempotent() {
        let (kps, set) = four_validators();
        let balances = BTreeMap::new();
        let mut leader = engine_for(kps[0].clone(), set.clone(), &balances);
        let block = leader.propose_block(vec![], 1).unwrap();
        let block_hash = block.block_hash();
        leader.pending_blocks.entry(1).or_default().insert(block_hash, block);
        leader.finalize_block(1, block_hash).unwrap();
        let height_after_first = leader.current_height();
        leader.finalize_block(1, block_hash).unwrap();
        assert_eq!(leader.current_height(), height_after_first);
    }
}
