//! # tbft-consensus
//!
//! A two-phase (Prevote -> Precommit) BFT consensus engine requiring a
//! strict majority greater than two-thirds of the validator set.
//!
//! This crate provides:
//! - [`Block`] / [`BlockHeader`]: the chain's append-only unit.
//! - [`Vote`] / [`Proposal`]: domain-separated signed consensus messages.
//! - [`VoteCollector`]: per-height/round/type vote tallying.
//! - [`ConsensusEngine`]: the Propose/Prevote/Precommit state machine.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod block;
mod engine;
mod error;
mod validator_set;
mod vote_collector;
mod votes;

pub use block::{Block, BlockHeader};
pub use engine::{ConsensusEngine, ConsensusOutcome};
pub use error::ConsensusError;
pub use validator_set::ValidatorSet;
pub use vote_collector::VoteCollector;
pub use votes::{Proposal, ProposalData, Vote, VoteData, VoteType};
