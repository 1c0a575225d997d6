use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use crate::core::transaction::Transaction;
use crate::node::Node;

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

fn message(text: impl Into<String>) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.into(),
    })
}

async fn index(State(node): State<Arc<Node>>) -> Json<serde_json::Value> {
    Json(json!({
        "message": "MyCoin node is running",
        "node_id": node.node_id(),
    }))
}

#[derive(Serialize)]
struct MineResponse {
    message: String,
    index: u64,
    transactions: Vec<Transaction>,
    proof: u64,
    previous_hash: String,
    reward: f64,
}

async fn mine(State(node): State<Arc<Node>>) -> Json<MineResponse> {
    let block = node.mine(node.node_id()).await;
    let reward = block.transactions.first().map(|tx| tx.amount).unwrap_or(0.0);
    Json(MineResponse {
        message: "New block successfully mined and broadcast to the network!".to_string(),
        index: block.index,
        transactions: block.transactions,
        proof: block.proof,
        previous_hash: block.previous_hash,
        reward,
    })
}

#[derive(Deserialize)]
struct NewTransactionRequest {
    sender: Option<String>,
    recipient: Option<String>,
    amount: Option<f64>,
    signature: Option<String>,
}

async fn new_transaction(
    State(node): State<Arc<Node>>,
    Json(request): Json<NewTransactionRequest>,
) -> (StatusCode, Json<MessageResponse>) {
    let (Some(sender), Some(recipient), Some(amount), Some(signature)) = (
        request.sender,
        request.recipient,
        request.amount,
        request.signature,
    ) else {
        return (
            StatusCode::BAD_REQUEST,
            message("Missing required values: sender, recipient, amount, signature"),
        );
    };

    let tx = Transaction::new(sender, recipient, amount, signature);
    match node.submit_transaction(tx).await {
        Ok(index) => (
            StatusCode::CREATED,
            message(format!(
                "Transaction added to the pool and broadcast to the network; it will be included in block {}",
                index
            )),
        ),
        Err(rejection) => (StatusCode::NOT_ACCEPTABLE, message(rejection.to_string())),
    }
}

async fn full_chain(State(node): State<Arc<Node>>) -> Json<crate::node::ChainView> {
    Json(node.get_chain().await)
}

#[derive(Serialize)]
struct BalanceResponse {
    address: String,
    balance: f64,
    message: String,
}

async fn get_balance(
    State(node): State<Arc<Node>>,
    Path(address): Path<String>,
) -> Json<BalanceResponse> {
    let balance = node.get_balance(&address).await;
    Json(BalanceResponse {
        address,
        balance,
        message: "Balance retrieved successfully".to_string(),
    })
}

#[derive(Deserialize)]
struct BlockNotice {
    // consensus re-fetches chains from peers, so the payload shape is not
    // validated beyond being present
    block: Option<serde_json::Value>,
}

async fn receive_block(
    State(node): State<Arc<Node>>,
    Json(notice): Json<BlockNotice>,
) -> (StatusCode, Json<MessageResponse>) {
    if notice.block.is_none() {
        return (StatusCode::BAD_REQUEST, message("Error: Missing block data"));
    }

    // the block itself is only a hint; consensus does the real work
    let replaced = node.receive_block().await;
    let text = if replaced {
        "New block received, chain updated via consensus."
    } else {
        "New block received, but local chain is authoritative or block is old."
    };
    (StatusCode::OK, message(text))
}

#[derive(Deserialize)]
struct RegisterNodesRequest {
    nodes: Option<Vec<String>>,
}

async fn register_nodes(
    State(node): State<Arc<Node>>,
    Json(request): Json<RegisterNodesRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Some(nodes) = request.nodes else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Error: Please supply a valid list of nodes" })),
        );
    };

    let total_nodes = node.register_peers(&nodes).await;
    (
        StatusCode::CREATED,
        Json(json!({
            "message": "New nodes have been added",
            "total_nodes": total_nodes,
        })),
    )
}

async fn get_nodes(State(node): State<Arc<Node>>) -> Json<serde_json::Value> {
    let nodes = node.peer_list().await;
    Json(json!({
        "message": "Current network nodes",
        "count": nodes.len(),
        "nodes": nodes,
    }))
}

async fn resolve(State(node): State<Arc<Node>>) -> Json<serde_json::Value> {
    let replaced = node.resolve().await;
    let view = node.get_chain().await;
    if replaced {
        Json(json!({
            "message": "Our chain was replaced by the longest valid chain",
            "new_chain": view.chain,
        }))
    } else {
        Json(json!({
            "message": "Our chain is authoritative",
            "chain": view.chain,
        }))
    }
}

/// Build the node's HTTP router.
pub fn router(node: Arc<Node>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/mine", get(mine))
        .route("/transactions/new", post(new_transaction))
        .route("/chain", get(full_chain))
        .route("/balance/:address", get(get_balance))
        .route("/blocks/new", post(receive_block))
        .route("/nodes/register", post(register_nodes))
        .route("/nodes/get", get(get_nodes))
        .route("/nodes/resolve", get(resolve))
        .layer(cors)
        .with_state(node)
}

/// Serve the API until the process exits.
pub async fn serve(node: Arc<Node>, port: u16) {
    let app = router(node);
    let addr = format!("0.0.0.0:{}", port);

    tracing::info!("MyCoin API server starting on {}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("   GET  /mine - Mine a new block");
    tracing::info!("   POST /transactions/new - Submit a signed transaction");
    tracing::info!("   GET  /chain - Full chain with length and difficulty");
    tracing::info!("   GET  /balance/:address - Address balance");
    tracing::info!("   POST /blocks/new - Inbound block notification");
    tracing::info!("   POST /nodes/register - Register peer nodes");
    tracing::info!("   GET  /nodes/get - List registered peers");
    tracing::info!("   GET  /nodes/resolve - Run longest-chain consensus");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind API listener");
    axum::serve(listener, app).await.expect("API server error");
}
