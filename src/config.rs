//! Configuration management for SabinaCoin

use crate::error::ChainError;
use crate::miner::{DEFAULT_DIFFICULTY, MAX_DIFFICULTY};
use rand::RngCore;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Identifier used as the sender of mining rewards.
    #[serde(default)]
    pub node_identifier: Option<String>,
    #[serde(default = "default_reward_receiver")]
    pub reward_receiver: String,
    #[serde(default = "default_reward_amount")]
    pub reward_amount: f64,
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,
    /// Also check block indices, timestamps and genesis when validating.
    #[serde(default)]
    pub strict_validation: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_identifier: None,
            reward_receiver: default_reward_receiver(),
            reward_amount: default_reward_amount(),
            difficulty: default_difficulty(),
            strict_validation: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    #[serde(default)]
    pub peers: Vec<String>,
    #[serde(default = "default_peer_timeout")]
    pub peer_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            peers: Vec::new(),
            peer_timeout_secs: default_peer_timeout(),
        }
    }
}

impl NetworkConfig {
    pub fn peer_timeout(&self) -> Duration {
        Duration::from_secs(self.peer_timeout_secs)
    }
}

impl Config {
    /// Check values the node cannot run with.
    pub fn validate(&self) -> Result<(), ChainError> {
        if !(1..=MAX_DIFFICULTY).contains(&self.node.difficulty) {
            return Err(ChainError::Config(format!(
                "node.difficulty must be between 1 and {}, got {}",
                MAX_DIFFICULTY, self.node.difficulty
            )));
        }

        if self.node.reward_receiver.trim().is_empty() {
            return Err(ChainError::Config(
                "node.reward_receiver must not be empty".to_string(),
            ));
        }

        if matches!(&self.node.node_identifier, Some(id) if id.trim().is_empty()) {
            return Err(ChainError::Config(
                "node.node_identifier must not be empty when set".to_string(),
            ));
        }

        if self.network.peer_timeout_secs == 0 {
            return Err(ChainError::Config(
                "network.peer_timeout_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// The configured identifier, or a fresh random one.
    pub fn node_identifier(&self) -> String {
        self.node
            .node_identifier
            .clone()
            .unwrap_or_else(generate_node_identifier)
    }
}

/// Load and validate configuration from `path`. A missing file yields defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ChainError> {
    let path = path.as_ref();
    let config: Config = if path.exists() {
        let config_str = fs::read_to_string(path)?;
        toml::from_str(&config_str)?
    } else {
        Config::default()
    };

    config.validate()?;
    Ok(config)
}

/// Random 128-bit identifier as 32 lowercase hex characters.
pub fn generate_node_identifier() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn default_reward_receiver() -> String {
    "Sabina".to_string()
}

fn default_reward_amount() -> f64 {
    1.0
}

fn default_difficulty() -> usize {
    DEFAULT_DIFFICULTY
}

fn default_api_port() -> u16 {
    5000
}

fn default_peer_timeout() -> u64 {
    10
}
