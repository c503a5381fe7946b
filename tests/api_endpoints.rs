//! Integration tests for SabinaCoin API endpoints
//!
//! These tests drive the router in-process and check status codes and JSON
//! shapes, including a two-node consensus round.

use async_trait::async_trait;
use axum_test::TestServer;
use sabinacoin::api::build_api_router;
use sabinacoin::config::Config;
use sabinacoin::error::ChainError;
use sabinacoin::network::{ChainResponse, PeerFetcher};
use sabinacoin::node::Node;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Serves chains straight from other in-process nodes.
#[derive(Default)]
struct InProcessFetcher {
    nodes: HashMap<String, Arc<Node>>,
}

#[async_trait]
impl PeerFetcher for InProcessFetcher {
    async fn fetch_chain(&self, peer: &str) -> Result<ChainResponse, ChainError> {
        match self.nodes.get(peer) {
            Some(node) => Ok(node.get_chain().await),
            None => Err(ChainError::PeerUnreachable {
                peer: peer.to_string(),
                reason: "no such node".to_string(),
            }),
        }
    }
}

fn test_config(identifier: &str) -> Config {
    let mut config = Config::default();
    config.node.difficulty = 2;
    config.node.node_identifier = Some(identifier.to_string());
    config
}

fn test_node(identifier: &str, fetcher: InProcessFetcher) -> Arc<Node> {
    Arc::new(Node::new(&test_config(identifier), Arc::new(fetcher)).expect("Failed to create node"))
}

fn test_server(node: Arc<Node>) -> TestServer {
    TestServer::new(build_api_router(node)).expect("Failed to create test server")
}

#[tokio::test]
async fn test_node_endpoints() {
    let server = test_server(test_node("node-a", InProcessFetcher::default()));

    // Test /health
    let response = server.get("/health").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["chain_length"], 1);
    assert!(json["timestamp"].is_string());

    // Test /get_chain (genesis only)
    let response = server.get("/get_chain").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["length"], 1);
    assert_eq!(json["chain"][0]["index"], 1);
    assert_eq!(json["chain"][0]["previousHash"], "0");
    assert_eq!(json["chain"][0]["proof"], 1);

    // Test /add_transaction
    let response = server
        .post("/add_transaction")
        .json(&json!({"sender": "A", "receiver": "B", "amount": 10}))
        .await;
    assert_eq!(response.status_code(), 201);
    let json: Value = response.json();
    assert_eq!(json["message"], "This transaction will be added to Block 2");

    // Missing keys are a client error
    let response = server
        .post("/add_transaction")
        .json(&json!({"sender": "A"}))
        .await;
    assert_eq!(response.status_code(), 400);
    let json: Value = response.json();
    assert!(json["error"].as_str().unwrap().contains("receiver"));

    // Test /mine_block
    let response = server.get("/mine_block").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["index"], 2);
    assert!(json["message"].is_string());
    assert!(json["previousHash"].as_str().unwrap().len() == 64);
    let transactions = json["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 2);
    assert_eq!(transactions[0]["sender"], "A");
    assert_eq!(transactions[0]["receiver"], "B");
    assert_eq!(transactions[1]["sender"], "node-a");
    assert_eq!(transactions[1]["receiver"], "Sabina");

    // Test /is_valid
    let response = server.get("/is_valid").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["valid"], true);
    assert_eq!(json["message"], "The blockchain is valid.");

    // Test /connect_node
    let response = server
        .post("/connect_node")
        .json(&json!({"nodes": ["http://127.0.0.1:5001", "127.0.0.1:5002"]}))
        .await;
    assert_eq!(response.status_code(), 201);
    let json: Value = response.json();
    assert_eq!(json["total_nodes"], json!(["127.0.0.1:5001", "127.0.0.1:5002"]));

    let response = server.post("/connect_node").json(&json!({})).await;
    assert_eq!(response.status_code(), 400);

    let response = server
        .post("/connect_node")
        .json(&json!({"nodes": ["http://"]}))
        .await;
    assert_eq!(response.status_code(), 400);

    // Test /replace_chain with unreachable peers
    let response = server.get("/replace_chain").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["replaced"], false);
    assert_eq!(json["new_chain"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_longer_peer_chain_replaces_local() {
    let peer = test_node("node-a", InProcessFetcher::default());
    for _ in 0..3 {
        peer.mine().await.expect("peer mining failed");
    }

    let mut fetcher = InProcessFetcher::default();
    fetcher.nodes.insert("127.0.0.1:5001".to_string(), peer.clone());
    let local = test_node("node-b", fetcher);
    let server = test_server(local.clone());

    server.get("/mine_block").await;

    let response = server
        .post("/connect_node")
        .json(&json!({"nodes": ["http://127.0.0.1:5001"]}))
        .await;
    assert_eq!(response.status_code(), 201);

    let response = server.get("/replace_chain").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["replaced"], true);
    assert_eq!(json["new_chain"].as_array().unwrap().len(), 4);

    let ours = local.get_chain().await.chain;
    let theirs = peer.get_chain().await.chain;
    assert_eq!(ours, theirs);

    // Equal length now: nothing to do.
    let json: Value = server.get("/replace_chain").await.json();
    assert_eq!(json["replaced"], false);

    // Mining continues on top of the adopted chain.
    let json: Value = server.get("/mine_block").await.json();
    assert_eq!(json["index"], 5);
    let json: Value = server.get("/is_valid").await.json();
    assert_eq!(json["valid"], true);
}
