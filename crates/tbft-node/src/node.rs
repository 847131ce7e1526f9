//! Per-validator orchestration: mempool, leader duty, and message dispatch.

use std::collections::{BTreeMap, HashMap, HashSet};

use tbft_consensus::{BlockHeader, ConsensusEngine, ConsensusOutcome, ValidatorSet};
use tbft_crypto::{Domain, Keypair};
use tbft_network::{NetMessage, Transport};
use tbft_primitives::{Address, Hash};
use tbft_state::{verify_transaction, Transaction, TransactionData};

use crate::config::NodeConfig;
use crate::error::{NodeError, NodeResult};

/// A single validator: wraps a [`ConsensusEngine`] with a transaction pool,
/// header/body gossip bookkeeping, and round-robin leader duty. Talks to
/// its peers only through a [`Transport`] passed into [`Self::tick`]; it
/// never holds a transport of its own, so many nodes can share one
/// simulated network.
pub struct Node {
    config: NodeConfig,
    keypair: Keypair,
    engine: ConsensusEngine,
    mempool: Vec<Transaction>,
    /// Headers accepted ahead of their body, by block hash.
    accepted_headers: HashMap<Hash, BlockHeader>,
    /// Transaction bodies this node can serve to a peer that requests them
    /// (either because it proposed the block, or because it reconstructed
    /// the body from a peer's response).
    bodies: HashMap<Hash, Vec<Transaction>>,
    /// Block hashes this node has already requested a body for, so a
    /// repeated header announcement doesn't re-request it.
    requested_bodies: HashSet<Hash>,
    tick_count: u64,
}

impl Node {
    /// Build a node and initialize its consensus engine at genesis.
    pub fn new(config: NodeConfig, keypair: Keypair, initial_balances: &BTreeMap<Address, u64>) -> NodeResult<Self> {
        if config.validator_set.is_empty() {
            return Err(NodeError::EmptyValidatorSet);
        }
        if !config.validator_set.contains(&config.address) {
            return Err(NodeError::NotAValidator(config.address));
        }
        let validator_set = ValidatorSet::new(config.validator_set.clone());
        let engine = ConsensusEngine::new(config.chain_id.clone(), validator_set, keypair.clone(), initial_balances);
        tracing::info!(address = %config.address, "node initialized");
        Ok(Self {
            config,
            keypair,
            engine,
            mempool: Vec::new(),
            accepted_headers: HashMap::new(),
            bodies: HashMap::new(),
            requested_bodies: HashSet::new(),
            tick_count: 0,
        })
    }

    /// This node's own address.
    pub fn address(&self) -> Address {
        self.config.address
    }

    /// Read-only access to the underlying consensus engine, for inspecting
    /// finalized state in tests.
    pub fn engine(&self) -> &ConsensusEngine {
        &self.engine
    }

    /// Number of transactions currently queued, not yet included in a
    /// proposed block.
    pub fn mempool_len(&self) -> usize {
        self.mempool.len()
    }

    /// Create and sign a new transaction from this node's own address. The
    /// nonce assigned is simply the count of this node's own transactions
    /// still sitting in its mempool — adequate for the single-sender-per-
    /// tick simulation workloads this is built for, not a safety property
    /// (the executor's nonce check is the actual safety boundary).
    pub fn create_transaction(&self, to: Address, amount: u64) -> NodeResult<Transaction> {
        let nonce = self.mempool.iter().filter(|tx| tx.data.from == self.address()).count() as u64;
        let data = TransactionData { from: self.address(), to, amount, nonce };
        Transaction::sign(Domain::Tx, self.config.chain_id.clone(), data, &self.keypair)
            .map_err(|e| NodeError::SigningFailed(e.to_string()))
    }

    /// Submit a transaction to this node's own mempool and broadcast it to
    /// every peer. An unverifiable transaction is logged and dropped.
    pub fn submit_transaction(&mut self, tx: Transaction, transport: &mut impl Transport) {
        if let Err(e) = verify_transaction(&tx, &self.config.chain_id) {
            tracing::warn!(error = %e, "rejected transaction: bad signature");
            return;
        }
        self.mempool.push(tx.clone());
        transport.broadcast(self.address(), &self.config.peers, NetMessage::Transaction(tx));
    }

    /// Drain every message waiting in this node's transport inbox,
    /// dispatch it, then propose a block if this node is the current
    /// leader and has transactions to include.
    pub fn tick(&mut self, transport: &mut impl Transport) {
        self.tick_count += 1;
        let messages = transport.get_messages(self.address());
        for message in messages {
            self.dispatch(message, transport);
        }
        self.propose_block_if_leader(transport);
    }

    fn dispatch(&mut self, message: NetMessage, transport: &mut impl Transport) {
        match message {
            NetMessage::Transaction(tx) => self.handle_transaction(tx),
            NetMessage::Vote(vote) => self.engine.receive_vote(&vote),
            NetMessage::Proposal(proposal) => self.engine.receive_proposal(&proposal),
            NetMessage::BlockHeader(header) => self.handle_block_header(header, transport),
            NetMessage::BlockBodyRequest { block_hash } => self.handle_block_body_request(block_hash, transport),
            NetMessage::BlockBody { block_hash, transactions } => self.handle_block_body(block_hash, transactions),
        }
        self.broadcast_outcomes(transport);
    }

    fn handle_transaction(&mut self, tx: Transaction) {
        if verify_transaction(&tx, &self.config.chain_id).is_err() {
            return;
        }
        let already_pooled = self.mempool.iter().any(|t| t.data.from == tx.data.from && t.data.nonce == tx.data.nonce);
        if !already_pooled {
            self.mempool.push(tx);
        }
    }

    fn handle_block_header(&mut self, header: BlockHeader, transport: &mut impl Transport) {
        if header.height != self.engine.current_height() {
            tracing::debug!(height = header.height, expected = self.engine.current_height(), "rejected header: wrong height");
            return;
        }
        if header.parent_hash != self.engine.last_block_hash() {
            tracing::debug!("rejected header: wrong parent");
            return;
        }
        let block_hash = tbft_crypto::hash_value(&header).expect("BlockHeader always serializes to valid JSON");
        tracing::debug!(%block_hash, "accepted header");
        self.accepted_headers.insert(block_hash, header);

        if !self.requested_bodies.contains(&block_hash) && !self.bodies.contains_key(&block_hash) {
            self.requested_bodies.insert(block_hash);
            transport.broadcast(self.address(), &self.config.peers, NetMessage::BlockBodyRequest { block_hash });
        }
    }

    fn handle_block_body_request(&mut self, block_hash: Hash, transport: &mut impl Transport) {
        if let Some(transactions) = self.bodies.get(&block_hash).cloned() {
            transport.broadcast(
                self.address(),
                &self.config.peers,
                NetMessage::BlockBody { block_hash, transactions },
            );
        }
    }

    /// Store a reconstructed body for a header we've already accepted.
    ///
    /// This does not feed the reconstructed block into the consensus
    /// engine: a `Block` synthesized from a bare header and body has no
    /// signature we can verify, since the proposer's signature covers the
    /// whole signed proposal envelope, not the header alone. Actual block
    /// acceptance only ever happens through [`NetMessage::Proposal`],
    /// broadcast in parallel with the header; this path exists purely to
    /// let a node serve bodies to peers that ask for them.
    fn handle_block_body(&mut self, block_hash: Hash, transactions: Vec<Transaction>) {
        if !self.accepted_headers.contains_key(&block_hash) {
            tracing::debug!(%block_hash, "received body for a header we never accepted");
            return;
        }
        tracing::debug!(%block_hash, tx_count = transactions.len(), "reconstructed block body");
        self.bodies.insert(block_hash, transactions);
    }

    fn propose_block_if_leader(&mut self, transport: &mut impl Transport) {
        let height = self.engine.current_height();
        let leader = match self.engine.validator_set().leader_for_height(height) {
            Some(leader) => leader,
            None => return,
        };
        if leader != self.address() || self.mempool.is_empty() {
            return;
        }

        let transactions = std::mem::take(&mut self.mempool);
        let block = match self.engine.propose_block(transactions.clone(), self.tick_count) {
            Ok(block) => block,
            Err(e) => {
                tracing::warn!(error = %e, "failed to build own proposal");
                self.mempool = transactions;
                return;
            }
        };
        let block_hash = block.block_hash();
        let header = block.header.clone();

        let proposal = match tbft_consensus::Proposal::sign(
            Domain::Block,
            self.config.chain_id.clone(),
            tbft_consensus::ProposalData { height, round: 0, block },
            &self.keypair,
        ) {
            Ok(proposal) => proposal,
            Err(e) => {
                tracing::warn!(error = %e, "failed to sign own proposal");
                return;
            }
        };

        tracing::info!(height, %block_hash, "proposing block");
        transport.broadcast(self.address(), &self.config.peers, NetMessage::BlockHeader(header.clone()));
        transport.broadcast(self.address(), &self.config.peers, NetMessage::Proposal(proposal.clone()));

        self.bodies.insert(block_hash, transactions);
        self.accepted_headers.insert(block_hash, header);
        self.engine.receive_proposal(&proposal);
        self.broadcast_outcomes(transport);
    }

    fn broadcast_outcomes(&mut self, transport: &mut impl Transport) {
        for outcome in self.engine.take_outcomes() {
            match outcome {
                ConsensusOutcome::Vote(vote) => {
                    transport.broadcast(self.address(), &self.config.peers, NetMessage::Vote(vote));
                }
                ConsensusOutcome::Finalized { height, block_hash } => {
                    tracing::info!(height, %block_hash, "observed finalization");
                }
            }
        }
    }
}
