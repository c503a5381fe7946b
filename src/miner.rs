//! Proof-of-work puzzle
//!
//! A proof `n` is valid after a previous proof `p` when the SHA-256 of the
//! decimal string of `n² - p²` starts with `difficulty` zero hex characters.
//! [`ProofOfWork::satisfies`] is the only place that predicate lives; the
//! solver and the chain validator both call it.

use crate::crypto::sha256_hex;
use std::time::Instant;
use tracing::debug;

/// Leading zero hex characters required by default.
pub const DEFAULT_DIFFICULTY: usize = 4;

/// A digest has 64 hex characters, so no difficulty above that is meaningful.
pub const MAX_DIFFICULTY: usize = 64;

/// How many candidates the cancellable solver tries between cancellation checks.
const CANCEL_CHECK_INTERVAL: u64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofOfWork {
    difficulty: usize,
}

impl Default for ProofOfWork {
    fn default() -> Self {
        Self::new(DEFAULT_DIFFICULTY)
    }
}

impl ProofOfWork {
    /// Difficulty is clamped to `MAX_DIFFICULTY`.
    pub fn new(difficulty: usize) -> Self {
        Self {
            difficulty: difficulty.min(MAX_DIFFICULTY),
        }
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// Decimal string of `proof² - previous_proof²`, signed, computed exactly.
    pub fn puzzle_input(proof: u64, previous_proof: u64) -> String {
        let a = (proof as u128) * (proof as u128);
        let b = (previous_proof as u128) * (previous_proof as u128);
        if a >= b {
            (a - b).to_string()
        } else {
            format!("-{}", b - a)
        }
    }

    pub fn satisfies(&self, proof: u64, previous_proof: u64) -> bool {
        let digest = sha256_hex(Self::puzzle_input(proof, previous_proof).as_bytes());
        digest.bytes().take(self.difficulty).all(|c| c == b'0')
    }

    /// Smallest proof, counting up from 1, that satisfies the puzzle.
    ///
    /// Unbounded; run it off the async executor.
    pub fn solve(&self, previous_proof: u64) -> u64 {
        self.solve_until(previous_proof, || false)
            .unwrap_or_else(|| unreachable!("solver without cancellation never gives up"))
    }

    /// Like [`solve`](Self::solve) but polls `cancelled` periodically and
    /// returns `None` once it reports true.
    pub fn solve_until<F>(&self, previous_proof: u64, cancelled: F) -> Option<u64>
    where
        F: Fn() -> bool,
    {
        let started = Instant::now();
        let mut proof: u64 = 1;
        loop {
            if proof % CANCEL_CHECK_INTERVAL == 0 && cancelled() {
                debug!(previous_proof, tried = proof, "proof-of-work search cancelled");
                return None;
            }
            if self.satisfies(proof, previous_proof) {
                debug!(
                    previous_proof,
                    proof,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "proof-of-work solved"
                );
                return Some(proof);
            }
            proof += 1;
        }
    }
}
