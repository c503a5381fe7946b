use crate::crypto::{canonical_digest, HexDigest};
use crate::error::ChainError;
use crate::mempool::PendingPool;
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use tracing::info;

/// `previous_hash` carried by the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";
/// Proof carried by the genesis block.
pub const GENESIS_PROOF: u64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// 1-based position in the chain.
    pub index: u64,
    /// Milliseconds since the Unix epoch. Advisory only.
    pub timestamp: u64,
    pub proof: u64,
    pub previous_hash: HexDigest,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(
        index: u64,
        proof: u64,
        previous_hash: HexDigest,
        transactions: Vec<Transaction>,
    ) -> Self {
        Block {
            index,
            timestamp: chrono::Utc::now().timestamp_millis() as u64,
            proof,
            previous_hash,
            transactions,
        }
    }

    /// SHA-256 over the canonical (key-sorted) JSON encoding of every field.
    pub fn hash(&self) -> Result<HexDigest, ChainError> {
        canonical_digest(self)
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 1 && self.previous_hash == GENESIS_PREVIOUS_HASH
    }
}

/// The chain and its pending transaction pool.
///
/// Every mutation goes through `&mut self`, so whoever owns the ledger
/// behind a lock gets block creation (append + pool drain) and chain
/// replacement as single atomic steps.
#[derive(Debug, Clone)]
pub struct Ledger {
    chain: Vec<Block>,
    pending: PendingPool,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// Create a ledger holding only the genesis block.
    pub fn new() -> Self {
        // The pool exists before genesis is built, and is empty.
        let mut ledger = Ledger {
            chain: Vec::new(),
            pending: PendingPool::new(),
        };
        ledger.create_block(GENESIS_PROOF, GENESIS_PREVIOUS_HASH.to_string());
        ledger
    }

    /// Append a block embedding every pending transaction and drain the pool.
    pub fn create_block(&mut self, proof: u64, previous_hash: HexDigest) -> Block {
        let index = self.chain.len() as u64 + 1;
        let mut block = Block::new(index, proof, previous_hash, self.pending.take_all());

        if let Some(last) = self.chain.last() {
            block.timestamp = block.timestamp.max(last.timestamp);
        }

        info!(
            index = block.index,
            proof = block.proof,
            transactions = block.transactions.len(),
            "block created"
        );
        self.chain.push(block.clone());
        block
    }

    /// Append a block only if the head is still the one the proof was
    /// solved against.
    pub fn append_block(
        &mut self,
        proof: u64,
        expected_previous_hash: &str,
    ) -> Result<Block, ChainError> {
        let head_hash = self.check_head(expected_previous_hash)?;
        Ok(self.create_block(proof, head_hash))
    }

    /// Like [`append_block`](Self::append_block), with `reward` queued behind
    /// the pending transactions once the head check has passed. A stale head
    /// leaves the pool untouched.
    pub fn append_block_with_reward(
        &mut self,
        proof: u64,
        expected_previous_hash: &str,
        reward: Transaction,
    ) -> Result<Block, ChainError> {
        let head_hash = self.check_head(expected_previous_hash)?;
        self.pending.add_transaction(reward);
        Ok(self.create_block(proof, head_hash))
    }

    fn check_head(&self, expected_previous_hash: &str) -> Result<HexDigest, ChainError> {
        let head_hash = self.previous_block()?.hash()?;
        if head_hash != expected_previous_hash {
            return Err(ChainError::StaleHead {
                expected: expected_previous_hash.to_string(),
                actual: head_hash,
            });
        }
        Ok(head_hash)
    }

    pub fn previous_block(&self) -> Result<&Block, ChainError> {
        self.chain.last().ok_or(ChainError::EmptyChain)
    }

    /// Queue a transaction and return the index of the block it will land in.
    pub fn add_transaction(&mut self, tx: Transaction) -> Result<u64, ChainError> {
        let next_index = self.previous_block()?.index + 1;
        self.pending.add_transaction(tx);
        Ok(next_index)
    }

    /// Swap the whole chain. The pending pool is left as it is.
    pub fn replace_chain(&mut self, chain: Vec<Block>) -> Result<(), ChainError> {
        if chain.is_empty() {
            return Err(ChainError::EmptyChain);
        }
        info!(
            old_length = self.chain.len(),
            new_length = chain.len(),
            "chain replaced"
        );
        self.chain = chain;
        Ok(())
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn pending(&self) -> &[Transaction] {
        self.pending.transactions()
    }
}
