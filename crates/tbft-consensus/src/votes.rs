//! Votes and proposals: the two signed consensus message kinds.

use serde::{Deserialize, Serialize};
use tbft_crypto::{CryptoError, Domain, SignedEnvelope};
use tbft_primitives::{Address, Hash};

use crate::block::Block;

/// The two phases of this core's voting protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteType {
    /// First-phase vote: "I saw a valid proposal for this block."
    Prevote,
    /// Second-phase vote: "A Prevote quorum exists for this block."
    Precommit,
}

/// The unsigned fields of a vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteData {
    /// Which phase this vote belongs to.
    pub vote_type: VoteType,
    /// The height being voted on.
    pub height: u64,
    /// Reserved; always 0 in this core.
    pub round: u32,
    /// The block hash voted for, or `None` for a nil vote.
    pub block_hash: Option<Hash>,
}

/// A vote, domain-separated under [`Domain::Vote`].
pub type Vote = SignedEnvelope<VoteData>;

/// Verify a vote's signature against the expected chain id.
pub fn verify_vote(vote: &Vote, chain_id: &str) -> Result<(), CryptoError> {
    vote.verify(Domain::Vote, chain_id)
}

/// The casting validator's address, i.e. the envelope's signer.
pub fn voter(vote: &Vote) -> Address {
    vote.signer_address
}

/// The unsigned fields of a block proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalData {
    /// The proposed height.
    pub height: u64,
    /// Reserved; always 0 in this core.
    pub round: u32,
    /// The proposed block.
    pub block: Block,
}

/// A block proposal, domain-separated under [`Domain::Block`].
pub type Proposal = SignedEnvelope<ProposalData>;

/// Verify a proposal's signature against the expected chain id.
pub fn verify_proposal(proposal: &Proposal, chain_id: &str) -> Result<(), CryptoError> {
    proposal.verify(Domain::Block, chain_id)
}

/// The proposing validator's address, i.e. the envelope's signer.
pub fn proposer(proposal: &Proposal) -> Address {
    proposal.signer_address
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tbft_crypto::Keypair;

    #[test]
    fn vote_sign_and_verify_roundtrip() {
        let kp = Keypair::generate();
        let data = VoteData { vote_type: VoteType::Prevote, height: 1, round: 0, block_hash: Some(Hash::ZERO) };
        let vote = Vote::sign(Domain::Vote, "chain-1", data, &kp).unwrap();
        assert!(verify_vote(&vote, "chain-1").is_ok());
        assert_eq!(voter(&vote), kp.address());
    }

    #[test]
    fn nil_vote_has_no_block_hash() {
        let kp = Keypair::generate();
        let data = VoteData { vote_type: VoteType::Precommit, height: 2, round: 0, block_hash: None };
        let vote = Vote::sign(Domain::Vote, "chain-1", data, &kp).unwrap();
        assert!(vote.data.block_hash.is_none());
    }

    #[test]
    fn proposal_sign_and_verify_roundtrip() {
        let kp = Keypair::generate();
        let balances = BTreeMap::new();
        let block = Block::create_genesis(&balances);
        let data = ProposalData { height: 0, round: 0, block };
        let proposal = Proposal::sign(Domain::Block, "chain-1", data, &kp).unwrap();
        assert!(verify_proposal(&proposal, "chain-1").is_ok());
        assert_eq!(proposer(&proposal), kp.address());
    }

    #[test]
    fn proposal_rejects_wrong_domain() {
        let kp = Keypair::generate();
        let balances = BTreeMap::new();
        let block = Block::create_genesis(&balances);
        let data = ProposalData { height: 0, round: 0, block };
        let proposal = Proposal::sign(Domain::Block, "chain-1", data, &kp).unwrap();
        assert!(proposal.verify(Domain::Vote, "chain-1").is_err());
    }
}
