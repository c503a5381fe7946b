#![forbid(unsafe_code)]
//! SabinaCoin node: loads configuration, builds the ledger and serves the API.

use clap::Parser;
use sabinacoin::api::run_api_server;
use sabinacoin::config::{load_config, DEFAULT_CONFIG_PATH};
use sabinacoin::node::Node;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sabinacoin-node", about = "SabinaCoin proof-of-work ledger node")]
struct Cli {
    /// Path to a TOML configuration file. A missing file means defaults.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Port for the HTTP API (overrides network.api_port).
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Peer to register at startup; may be repeated.
    #[arg(long = "peer")]
    peers: Vec<String>,

    /// Leading zero hex characters required of a proof (overrides node.difficulty).
    #[arg(long)]
    difficulty: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    if let Some(port) = cli.port {
        config.network.api_port = port;
    }
    if let Some(difficulty) = cli.difficulty {
        config.node.difficulty = difficulty;
    }
    config.network.peers.extend(cli.peers);

    let node = Arc::new(Node::from_config(&config)?);
    info!(
        identifier = node.identifier(),
        peers = config.network.peers.len(),
        "starting SabinaCoin node"
    );

    run_api_server(node, config.network.api_port).await?;
    Ok(())
}
