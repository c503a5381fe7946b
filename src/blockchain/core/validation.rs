use crate::blockchain::core::chain::{Block, GENESIS_PREVIOUS_HASH};
use crate::error::ChainError;
use crate::miner::ProofOfWork;

/// Walks a chain checking hash linkage and proof-of-work between neighbours.
///
/// The default mode checks exactly that and nothing else: block indices,
/// timestamps and the genesis block itself are taken on trust. Strict mode
/// additionally requires a well-formed genesis block, indices equal to
/// position + 1 and non-decreasing timestamps.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainValidator {
    pow: ProofOfWork,
    strict: bool,
}

impl ChainValidator {
    pub fn new(pow: ProofOfWork) -> Self {
        Self { pow, strict: false }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn pow(&self) -> &ProofOfWork {
        &self.pow
    }

    /// Check `chain`, stopping at the first violation.
    ///
    /// Validation failures come back as the corresponding `ChainError`
    /// variant; an `Encoding` error means a block could not be hashed at all.
    pub fn validate(&self, chain: &[Block]) -> Result<(), ChainError> {
        if self.strict {
            Self::check_genesis(chain)?;
        }

        for pair in chain.windows(2) {
            let (previous, current) = (&pair[0], &pair[1]);

            if current.previous_hash != previous.hash()? {
                return Err(ChainError::InvalidBlockLinkage {
                    index: current.index,
                });
            }

            if !self.pow.satisfies(current.proof, previous.proof) {
                return Err(ChainError::InvalidProofOfWork {
                    index: current.index,
                });
            }

            if self.strict {
                if current.index != previous.index + 1 {
                    return Err(ChainError::InvalidBlockIndex {
                        expected: previous.index + 1,
                        actual: current.index,
                    });
                }
                if current.timestamp < previous.timestamp {
                    return Err(ChainError::InvalidTimestamp {
                        index: current.index,
                    });
                }
            }
        }

        Ok(())
    }

    /// `Ok(true)` for a valid chain, `Ok(false)` for a chain that fails a
    /// check, `Err` only when hashing itself failed.
    pub fn is_valid(&self, chain: &[Block]) -> Result<bool, ChainError> {
        match self.validate(chain) {
            Ok(()) => Ok(true),
            Err(e) if e.is_validation_failure() => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn check_genesis(chain: &[Block]) -> Result<(), ChainError> {
        let genesis = chain
            .first()
            .ok_or_else(|| ChainError::InvalidGenesis("chain is empty".to_string()))?;
        if genesis.previous_hash != GENESIS_PREVIOUS_HASH {
            return Err(ChainError::InvalidGenesis(format!(
                "previous hash is {:?}",
                genesis.previous_hash
            )));
        }
        if genesis.index != 1 {
            return Err(ChainError::InvalidBlockIndex {
                expected: 1,
                actual: genesis.index,
            });
        }
        Ok(())
    }
}
