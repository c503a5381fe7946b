//! Peer bookkeeping and chain fetching
//!
//! Peers are stored as `host:port` strings. Fetching a peer's chain goes
//! through the [`PeerFetcher`] trait so the consensus code never touches the
//! transport directly.

use crate::blockchain::Block;
use crate::error::ChainError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use url::Url;

/// Path every node serves its chain on.
pub const CHAIN_PATH: &str = "/get_chain";

/// Default timeout for a single peer chain request.
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(10);

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A node's chain as served on [`CHAIN_PATH`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
    pub length: usize,
}

impl ChainResponse {
    pub fn new(chain: Vec<Block>) -> Self {
        let length = chain.len();
        Self { chain, length }
    }
}

/// Known peers, iterated in a stable (sorted) order.
#[derive(Debug, Clone, Default)]
pub struct PeerSet {
    peers: BTreeSet<String>,
}

impl PeerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reduce an address such as `http://127.0.0.1:5001/` to `127.0.0.1:5001`.
    /// A bare `host:port` is read as if it had an `http://` prefix.
    pub fn normalize(address: &str) -> Result<String, ChainError> {
        let trimmed = address.trim();
        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("http://{}", trimmed)
        };

        let url = Url::parse(&with_scheme)
            .map_err(|e| ChainError::InvalidPeerAddress(format!("{}: {}", address, e)))?;
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ChainError::InvalidPeerAddress(format!("{}: missing host", address)))?;

        Ok(match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        })
    }

    /// Add a peer, returning its normalized form. Re-adding is a no-op.
    pub fn register(&mut self, address: &str) -> Result<String, ChainError> {
        let peer = Self::normalize(address)?;
        self.peers.insert(peer.clone());
        Ok(peer)
    }

    pub fn contains(&self, peer: &str) -> bool {
        self.peers.contains(peer)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.peers.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

/// Fetches the chain a peer currently reports.
///
/// Any transport failure must come back as `ChainError::PeerUnreachable`.
#[async_trait]
pub trait PeerFetcher: Send + Sync {
    async fn fetch_chain(&self, peer: &str) -> Result<ChainResponse, ChainError>;
}

/// [`PeerFetcher`] speaking plain HTTP to other nodes.
pub struct HttpPeerFetcher {
    http_client: reqwest::Client,
}

impl Default for HttpPeerFetcher {
    fn default() -> Self {
        Self::with_timeout(DEFAULT_PEER_TIMEOUT)
    }
}

impl HttpPeerFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(timeout))
            .build()
            .unwrap_or_default();
        Self { http_client }
    }

    pub fn chain_url(peer: &str) -> String {
        format!("http://{}{}", peer, CHAIN_PATH)
    }
}

#[async_trait]
impl PeerFetcher for HttpPeerFetcher {
    async fn fetch_chain(&self, peer: &str) -> Result<ChainResponse, ChainError> {
        let peer_unreachable = |reason: String| ChainError::PeerUnreachable {
            peer: peer.to_string(),
            reason,
        };

        let response = self
            .http_client
            .get(Self::chain_url(peer))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    peer_unreachable(format!("request timed out: {e}"))
                } else if e.is_connect() {
                    peer_unreachable(format!("connection failed: {e}"))
                } else {
                    peer_unreachable(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(peer_unreachable(format!("HTTP status {}", response.status())));
        }

        response
            .json::<ChainResponse>()
            .await
            .map_err(|e| peer_unreachable(format!("failed to decode chain: {e}")))
    }
}
