//! Longest-valid-chain consensus
//!
//! Peers are asked for their chains one by one. A peer's chain is a
//! candidate only when it is strictly longer than the best seen so far
//! (starting from the local length) and passes validation; the first peer
//! to reach a given length keeps it. Unreachable peers and bad chains are
//! skipped, never fatal.

use crate::blockchain::{Block, ChainValidator, Ledger};
use crate::error::ChainError;
use crate::network::{ChainResponse, PeerFetcher};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// A peer chain that won selection.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub peer: String,
    pub chain: Vec<Block>,
}

pub struct ConsensusResolver {
    validator: ChainValidator,
}

impl ConsensusResolver {
    pub fn new(validator: ChainValidator) -> Self {
        Self { validator }
    }

    /// Accept a peer's response as a chain, or say why it was rejected.
    pub fn check_candidate(
        &self,
        peer: &str,
        response: ChainResponse,
    ) -> Result<Vec<Block>, ChainError> {
        let rejected = |reason: String| ChainError::ChainInvalid {
            peer: peer.to_string(),
            reason,
        };

        if response.length != response.chain.len() {
            return Err(rejected(format!(
                "reported length {} but sent {} blocks",
                response.length,
                response.chain.len()
            )));
        }

        match self.validator.validate(&response.chain) {
            Ok(()) => Ok(response.chain),
            Err(e) if e.is_validation_failure() => Err(rejected(e.to_string())),
            Err(e) => {
                error!(peer, error = %e, "could not hash peer chain");
                Err(rejected(e.to_string()))
            }
        }
    }

    /// Pick the longest valid chain longer than `local_length`, if any.
    ///
    /// Holds no lock; callers pass a snapshot of the peer list.
    pub async fn select_longest(
        &self,
        peers: &[String],
        local_length: usize,
        fetcher: &dyn PeerFetcher,
    ) -> Option<Candidate> {
        let mut max_length = local_length;
        let mut best: Option<Candidate> = None;

        for peer in peers {
            let response = match fetcher.fetch_chain(peer).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(peer = %peer, error = %e, "skipping peer");
                    continue;
                }
            };

            if response.length <= max_length {
                debug!(
                    peer = %peer,
                    length = response.length,
                    max_length,
                    "peer chain not longer"
                );
                continue;
            }

            match self.check_candidate(peer, response) {
                Ok(chain) => {
                    max_length = chain.len();
                    best = Some(Candidate {
                        peer: peer.clone(),
                        chain,
                    });
                }
                Err(e) => warn!(peer = %peer, error = %e, "discarding peer chain"),
            }
        }

        best
    }

    /// Replace the ledger's chain with the longest valid peer chain.
    ///
    /// Fetching and validation happen without the ledger lock. The write
    /// lock is taken only for the final swap, after re-checking that the
    /// candidate still beats the local chain, which may have grown meanwhile.
    pub async fn resolve_chain(
        &self,
        ledger: &RwLock<Ledger>,
        peers: &[String],
        fetcher: &dyn PeerFetcher,
    ) -> Result<bool, ChainError> {
        let local_length = ledger.read().await.len();

        let Some(candidate) = self.select_longest(peers, local_length, fetcher).await else {
            return Ok(false);
        };

        let mut ledger = ledger.write().await;
        if candidate.chain.len() <= ledger.len() {
            info!(
                peer = %candidate.peer,
                candidate_length = candidate.chain.len(),
                local_length = ledger.len(),
                "local chain grew during resolution, keeping it"
            );
            return Ok(false);
        }

        info!(
            peer = %candidate.peer,
            length = candidate.chain.len(),
            "adopting longer chain from peer"
        );
        ledger.replace_chain(candidate.chain)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::miner::ProofOfWork;
    use crate::transaction::Transaction;
    use async_trait::async_trait;
    use std::collections::HashMap;

    const TEST_DIFFICULTY: usize = 2;

    struct StubFetcher {
        responses: HashMap<String, Result<ChainResponse, ChainError>>,
    }

    impl StubFetcher {
        fn new() -> Self {
            Self {
                responses: HashMap::new(),
            }
        }

        fn with_chain(mut self, peer: &str, chain: Vec<Block>) -> Self {
            self.responses
                .insert(peer.to_string(), Ok(ChainResponse::new(chain)));
            self
        }

        fn with_response(mut self, peer: &str, response: ChainResponse) -> Self {
            self.responses.insert(peer.to_string(), Ok(response));
            self
        }

        fn unreachable(mut self, peer: &str) -> Self {
            self.responses.insert(
                peer.to_string(),
                Err(ChainError::PeerUnreachable {
                    peer: peer.to_string(),
                    reason: "connection refused".to_string(),
                }),
            );
            self
        }
    }

    #[async_trait]
    impl PeerFetcher for StubFetcher {
        async fn fetch_chain(&self, peer: &str) -> Result<ChainResponse, ChainError> {
            self.responses.get(peer).cloned().unwrap_or_else(|| {
                Err(ChainError::PeerUnreachable {
                    peer: peer.to_string(),
                    reason: "unknown peer".to_string(),
                })
            })
        }
    }

    fn pow() -> ProofOfWork {
        ProofOfWork::new(TEST_DIFFICULTY)
    }

    fn resolver() -> ConsensusResolver {
        ConsensusResolver::new(ChainValidator::new(pow()))
    }

    fn ledger_with_length(length: usize, tag: &str) -> Ledger {
        let pow = pow();
        let mut ledger = Ledger::new();
        while ledger.len() < length {
            ledger
                .add_transaction(Transaction::new(tag, "peer", ledger.len() as f64))
                .unwrap();
            let previous = ledger.previous_block().unwrap().clone();
            let proof = pow.solve(previous.proof);
            ledger.create_block(proof, previous.hash().unwrap());
        }
        ledger
    }

    fn chain_of(length: usize, tag: &str) -> Vec<Block> {
        ledger_with_length(length, tag).chain().to_vec()
    }

    fn peers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_longest_valid_chain_wins() {
        let longest = chain_of(7, "b");
        let fetcher = StubFetcher::new()
            .with_chain("a:1", chain_of(3, "a"))
            .with_chain("b:1", longest.clone())
            .with_chain("c:1", chain_of(5, "c"));
        let ledger = RwLock::new(ledger_with_length(4, "local"));

        let replaced = resolver()
            .resolve_chain(&ledger, &peers(&["a:1", "b:1", "c:1"]), &fetcher)
            .await
            .unwrap();

        assert!(replaced);
        let ledger = ledger.read().await;
        assert_eq!(ledger.len(), 7);
        assert_eq!(ledger.chain(), longest.as_slice());
    }

    #[tokio::test]
    async fn test_shorter_or_equal_chains_leave_local_untouched() {
        let fetcher = StubFetcher::new()
            .with_chain("a:1", chain_of(2, "a"))
            .with_chain("b:1", chain_of(4, "b"));
        let local = ledger_with_length(4, "local");
        let before = local.chain().to_vec();
        let ledger = RwLock::new(local);

        let replaced = resolver()
            .resolve_chain(&ledger, &peers(&["a:1", "b:1"]), &fetcher)
            .await
            .unwrap();

        assert!(!replaced);
        assert_eq!(ledger.read().await.chain(), before.as_slice());
    }

    #[tokio::test]
    async fn test_no_peers_means_no_replacement() {
        let ledger = RwLock::new(Ledger::new());
        let replaced = resolver()
            .resolve_chain(&ledger, &[], &StubFetcher::new())
            .await
            .unwrap();
        assert!(!replaced);
        assert_eq!(ledger.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_and_invalid_peers_are_skipped() {
        let mut tampered = chain_of(9, "bad");
        tampered[4].previous_hash = "0".repeat(64);
        let good = chain_of(6, "good");

        let fetcher = StubFetcher::new()
            .unreachable("a:1")
            .with_chain("b:1", tampered)
            .with_chain("c:1", good.clone());

        let candidate = resolver()
            .select_longest(&peers(&["a:1", "b:1", "c:1", "missing:1"]), 2, &fetcher)
            .await
            .unwrap();

        assert_eq!(candidate.peer, "c:1");
        assert_eq!(candidate.chain, good);
    }

    #[tokio::test]
    async fn test_ties_go_to_first_seen_peer() {
        let first = chain_of(5, "first");
        let fetcher = StubFetcher::new()
            .with_chain("a:1", first.clone())
            .with_chain("b:1", chain_of(5, "second"));

        let candidate = resolver()
            .select_longest(&peers(&["a:1", "b:1"]), 1, &fetcher)
            .await
            .unwrap();

        assert_eq!(candidate.peer, "a:1");
        assert_eq!(candidate.chain, first);
    }

    #[tokio::test]
    async fn test_misreported_length_is_rejected() {
        let chain = chain_of(3, "liar");
        let fetcher = StubFetcher::new().with_response(
            "a:1",
            ChainResponse {
                chain,
                length: 50,
            },
        );

        assert!(resolver()
            .select_longest(&peers(&["a:1"]), 1, &fetcher)
            .await
            .is_none());
    }

    #[test]
    fn test_check_candidate_reports_reason() {
        let mut chain = chain_of(3, "x");
        chain[2].previous_hash = "nope".to_string();
        let err = resolver()
            .check_candidate("a:1", ChainResponse::new(chain))
            .unwrap_err();
        match err {
            ChainError::ChainInvalid { peer, reason } => {
                assert_eq!(peer, "a:1");
                assert!(reason.contains("linkage"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
