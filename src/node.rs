//! Node context: one ledger, its peers and the operations the HTTP layer
//! exposes on top of them.

use crate::blockchain::{Block, ChainValidator, Ledger};
use crate::config::Config;
use crate::consensus::ConsensusResolver;
use crate::error::ChainError;
use crate::miner::ProofOfWork;
use crate::network::{ChainResponse, HttpPeerFetcher, PeerFetcher, PeerSet};
use crate::transaction::Transaction;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

pub struct Node {
    identifier: String,
    reward_receiver: String,
    reward_amount: f64,
    pow: ProofOfWork,
    validator: ChainValidator,
    resolver: ConsensusResolver,
    ledger: Arc<RwLock<Ledger>>,
    peers: Arc<RwLock<PeerSet>>,
    fetcher: Arc<dyn PeerFetcher>,
    /// Bumped on every chain replacement; an in-flight solve started under
    /// an older value gives up.
    chain_generation: Arc<AtomicU64>,
    /// One mining cycle at a time.
    mining: Mutex<()>,
    blocks_mined: AtomicU64,
}

/// Raises its flag when dropped, so a blocking solve notices that the
/// `mine()` call waiting on it is gone.
struct AbandonOnDrop(Arc<AtomicBool>);

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl Node {
    /// Build a node fetching peer chains over HTTP.
    pub fn from_config(config: &Config) -> Result<Self, ChainError> {
        let fetcher = Arc::new(HttpPeerFetcher::with_timeout(config.network.peer_timeout()));
        Self::new(config, fetcher)
    }

    /// Build a node with the given peer transport. Peers listed in the
    /// configuration are registered immediately.
    pub fn new(config: &Config, fetcher: Arc<dyn PeerFetcher>) -> Result<Self, ChainError> {
        config.validate()?;

        let pow = ProofOfWork::new(config.node.difficulty);
        let validator = ChainValidator::new(pow).with_strict(config.node.strict_validation);

        let mut peers = PeerSet::new();
        for address in &config.network.peers {
            peers.register(address)?;
        }

        let node = Self {
            identifier: config.node_identifier(),
            reward_receiver: config.node.reward_receiver.clone(),
            reward_amount: config.node.reward_amount,
            pow,
            validator,
            resolver: ConsensusResolver::new(validator),
            ledger: Arc::new(RwLock::new(Ledger::new())),
            peers: Arc::new(RwLock::new(peers)),
            fetcher,
            chain_generation: Arc::new(AtomicU64::new(0)),
            mining: Mutex::new(()),
            blocks_mined: AtomicU64::new(0),
        };

        info!(
            identifier = %node.identifier,
            difficulty = pow.difficulty(),
            strict_validation = validator.is_strict(),
            "node initialised"
        );
        Ok(node)
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn difficulty(&self) -> usize {
        self.pow.difficulty()
    }

    pub fn blocks_mined(&self) -> u64 {
        self.blocks_mined.load(Ordering::Relaxed)
    }

    /// Solve the puzzle against the current head and append the new block
    /// with the mining reward as its last transaction.
    ///
    /// The solve runs on the blocking pool with no ledger lock held. If the
    /// chain is replaced meanwhile, the search is abandoned or its result is
    /// refused at append time, and the cycle starts over from the new head.
    /// The reward only enters the pool together with the block, so a restart
    /// or a dropped call never leaves one behind.
    pub async fn mine(&self) -> Result<Block, ChainError> {
        let _mining = self.mining.lock().await;
        let abandoned = Arc::new(AtomicBool::new(false));
        let _abandon = AbandonOnDrop(Arc::clone(&abandoned));

        let reward = Transaction::new(
            self.identifier.clone(),
            self.reward_receiver.clone(),
            self.reward_amount,
        );

        loop {
            let generation = self.chain_generation.load(Ordering::SeqCst);
            let (previous_proof, previous_hash) = {
                let ledger = self.ledger.read().await;
                let previous = ledger.previous_block()?;
                (previous.proof, previous.hash()?)
            };

            let pow = self.pow;
            let chain_generation = Arc::clone(&self.chain_generation);
            let abandoned = Arc::clone(&abandoned);
            let solved = tokio::task::spawn_blocking(move || {
                pow.solve_until(previous_proof, || {
                    chain_generation.load(Ordering::SeqCst) != generation
                        || abandoned.load(Ordering::SeqCst)
                })
            })
            .await
            .map_err(|e| ChainError::Internal(format!("proof-of-work task failed: {e}")))?;

            let Some(proof) = solved else {
                info!("chain replaced while mining, restarting from new head");
                continue;
            };

            let appended = self.ledger.write().await.append_block_with_reward(
                proof,
                &previous_hash,
                reward.clone(),
            );
            match appended {
                Ok(block) => {
                    self.blocks_mined.fetch_add(1, Ordering::SeqCst);
                    return Ok(block);
                }
                Err(ChainError::StaleHead { expected, actual }) => {
                    warn!(%expected, %actual, "mined on a stale head, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Queue a transaction; returns the index of the block it will land in.
    pub async fn submit_transaction(&self, tx: Transaction) -> Result<u64, ChainError> {
        let index = self.ledger.write().await.add_transaction(tx)?;
        debug!(index, "transaction queued");
        Ok(index)
    }

    pub async fn chain_length(&self) -> usize {
        self.ledger.read().await.len()
    }

    pub async fn get_chain(&self) -> ChainResponse {
        ChainResponse::new(self.ledger.read().await.chain().to_vec())
    }

    pub async fn pending_transactions(&self) -> Vec<Transaction> {
        self.ledger.read().await.pending().to_vec()
    }

    /// Validate a snapshot of the local chain.
    pub async fn is_valid(&self) -> Result<bool, ChainError> {
        let chain = self.ledger.read().await.chain().to_vec();
        self.validator.is_valid(&chain)
    }

    pub async fn register_peer(&self, address: &str) -> Result<String, ChainError> {
        let peer = self.peers.write().await.register(address)?;
        info!(peer = %peer, "peer registered");
        Ok(peer)
    }

    /// Register several peers. Every address is checked before any is added.
    pub async fn register_peers(&self, addresses: &[String]) -> Result<Vec<String>, ChainError> {
        for address in addresses {
            PeerSet::normalize(address)?;
        }

        let mut registered = Vec::with_capacity(addresses.len());
        for address in addresses {
            registered.push(self.register_peer(address).await?);
        }
        Ok(registered)
    }

    pub async fn peers(&self) -> Vec<String> {
        self.peers.read().await.to_vec()
    }

    /// Adopt the longest valid chain among known peers, if it beats ours.
    pub async fn resolve(&self) -> Result<bool, ChainError> {
        let peers = self.peers().await;
        let replaced = self
            .resolver
            .resolve_chain(&self.ledger, &peers, self.fetcher.as_ref())
            .await?;

        if replaced {
            self.chain_generation.fetch_add(1, Ordering::SeqCst);
        }
        Ok(replaced)
    }
}
