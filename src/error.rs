//! Error types for SabinaCoin

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("Chain is empty")]
    EmptyChain,
    #[error("Invalid transaction payload: {0}")]
    InvalidTransactionPayload(String),
    #[error("Invalid peer address: {0}")]
    InvalidPeerAddress(String),
    #[error("Peer {peer} unreachable: {reason}")]
    PeerUnreachable { peer: String, reason: String },
    #[error("Chain from peer {peer} rejected: {reason}")]
    ChainInvalid { peer: String, reason: String },
    #[error("Invalid block linkage at index {index}")]
    InvalidBlockLinkage { index: u64 },
    #[error("Invalid proof of work at index {index}")]
    InvalidProofOfWork { index: u64 },
    #[error("Invalid block index: expected {expected}, got {actual}")]
    InvalidBlockIndex { expected: u64, actual: u64 },
    #[error("Timestamp goes backwards at index {index}")]
    InvalidTimestamp { index: u64 },
    #[error("Invalid genesis block: {0}")]
    InvalidGenesis(String),
    #[error("Stale chain head: expected previous hash {expected}, head is {actual}")]
    StaleHead { expected: String, actual: String },
    #[error("Encoding error: {0}")]
    Encoding(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChainError {
    /// True for the validation failures that make a chain invalid, as
    /// opposed to failures of the machinery doing the checking.
    pub fn is_validation_failure(&self) -> bool {
        matches!(
            self,
            ChainError::InvalidBlockLinkage { .. }
                | ChainError::InvalidProofOfWork { .. }
                | ChainError::InvalidBlockIndex { .. }
                | ChainError::InvalidTimestamp { .. }
                | ChainError::InvalidGenesis(_)
        )
    }
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::Encoding(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::Config(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
