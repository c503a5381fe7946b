//! REST API for SabinaCoin
//!
//! Thin HTTP layer over [`Node`]: mining, transaction submission, chain
//! inspection, peer registration and consensus.

use axum::{
    extract::{Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

use crate::blockchain::Block;
use crate::error::ChainError;
use crate::network::{ChainResponse, CHAIN_PATH};
use crate::node::Node;
use crate::transaction::{parse_transaction_payload, Transaction};

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BlockchainError(ChainError),
    InvalidInput(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BlockchainError(
                e @ (ChainError::InvalidTransactionPayload(_) | ChainError::InvalidPeerAddress(_)),
            ) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::BlockchainError(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        ApiError::BlockchainError(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MinedBlockResponse {
    pub message: String,
    pub index: u64,
    pub timestamp: u64,
    pub proof: u64,
    pub previous_hash: String,
    pub transactions: Vec<Transaction>,
}

impl From<Block> for MinedBlockResponse {
    fn from(block: Block) -> Self {
        Self {
            message: "Congratulations, you have successfully mined a block!".to_string(),
            index: block.index,
            timestamp: block.timestamp,
            proof: block.proof,
            previous_hash: block.previous_hash,
            transactions: block.transactions,
        }
    }
}

#[derive(Serialize)]
pub struct ValidityResponse {
    pub valid: bool,
    pub message: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Deserialize)]
pub struct ConnectNodesRequest {
    pub nodes: Option<Vec<String>>,
}

#[derive(Serialize)]
pub struct ConnectNodesResponse {
    pub message: String,
    pub total_nodes: Vec<String>,
}

#[derive(Serialize)]
pub struct ReplaceChainResponse {
    pub message: String,
    pub replaced: bool,
    pub new_chain: Vec<Block>,
}

// ============================================================================
// Middleware
// ============================================================================

/// Logs method, path, status and duration of every request.
async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Build the router with all endpoints.
pub fn build_api_router(node: Arc<Node>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![http::header::CONTENT_TYPE]);

    Router::new()
        .route("/mine_block", get(mine_block))
        .route(CHAIN_PATH, get(get_chain))
        .route("/is_valid", get(is_valid))
        .route("/add_transaction", post(add_transaction))
        .route("/connect_node", post(connect_node))
        .route("/replace_chain", get(replace_chain))
        .route("/health", get(health_check))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(node)
        .layer(cors)
}

/// Serve the API on `0.0.0.0:port` until the process exits.
pub async fn run_api_server(node: Arc<Node>, port: u16) -> Result<(), ChainError> {
    let app = build_api_router(node);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(%addr, "API server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn mine_block(State(node): State<Arc<Node>>) -> Result<Json<MinedBlockResponse>, ApiError> {
    let block = node.mine().await?;
    Ok(Json(block.into()))
}

async fn get_chain(State(node): State<Arc<Node>>) -> Json<ChainResponse> {
    Json(node.get_chain().await)
}

async fn is_valid(State(node): State<Arc<Node>>) -> Result<Json<ValidityResponse>, ApiError> {
    let valid = node.is_valid().await?;
    let message = if valid {
        "The blockchain is valid."
    } else {
        "The blockchain is invalid."
    };
    Ok(Json(ValidityResponse {
        valid,
        message: message.to_string(),
    }))
}

async fn add_transaction(
    State(node): State<Arc<Node>>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let tx = parse_transaction_payload(&payload)?;
    let index = node.submit_transaction(tx).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: format!("This transaction will be added to Block {}", index),
        }),
    ))
}

async fn connect_node(
    State(node): State<Arc<Node>>,
    Json(request): Json<ConnectNodesRequest>,
) -> Result<(StatusCode, Json<ConnectNodesResponse>), ApiError> {
    let nodes = request
        .nodes
        .ok_or_else(|| ApiError::InvalidInput("There are no nodes.".to_string()))?;

    node.register_peers(&nodes).await?;

    Ok((
        StatusCode::CREATED,
        Json(ConnectNodesResponse {
            message: "All the nodes are connected. The network now contains the following nodes:"
                .to_string(),
            total_nodes: node.peers().await,
        }),
    ))
}

async fn replace_chain(State(node): State<Arc<Node>>) -> Result<Json<ReplaceChainResponse>, ApiError> {
    let replaced = node.resolve().await?;
    let message = if replaced {
        "The nodes had different chains. The chain was replaced by the longest one."
    } else {
        "All good. The chain is the longest and was not replaced."
    };

    Ok(Json(ReplaceChainResponse {
        message: message.to_string(),
        replaced,
        new_chain: node.get_chain().await.chain,
    }))
}

async fn health_check(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let length = node.chain_length().await;
    Json(serde_json::json!({
        "status": "healthy",
        "node_identifier": node.identifier(),
        "chain_length": length,
        "difficulty": node.difficulty(),
        "blocks_mined": node.blocks_mined(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
