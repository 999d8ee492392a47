use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ledger_core::consensus::{PeerChain, PeerFetch};
use ledger_core::constants::WIRE_FORMAT_VERSION;
use ledger_core::node::{MineOutcome, Node};
use ledger_core::{Block, LedgerError, Transaction};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("{0}")]
    Conflict(&'static str),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Ledger(
                LedgerError::MissingField(_)
                | LedgerError::EmptyNodeList
                | LedgerError::InvalidAddress(_),
            ) => StatusCode::BAD_REQUEST,
            ApiError::Ledger(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
        };
        let message = match &self {
            ApiError::Ledger(LedgerError::MissingField(_)) => "Missing values",
            ApiError::Ledger(LedgerError::EmptyNodeList) => {
                "Error: Please provide a valid list of nodes"
            }
            ApiError::Ledger(_) => "Invalid request",
            ApiError::Conflict(msg) => *msg,
        };
        (
            status,
            Json(json!({ "message": message, "error": self.to_string() })),
        )
            .into_response()
    }
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    node_id: String,
    difficulty: usize,
    wire_format: u32,
}

#[derive(Serialize)]
struct Forged {
    message: &'static str,
    index: u64,
    transactions: Vec<Transaction>,
    proof: u64,
    previous_hash: String,
}

/// Every field is optional so a missing one is reported as such rather than
/// as a generic decoding failure.
#[derive(Deserialize)]
struct TxIn {
    sender: Option<String>,
    recipient: Option<String>,
    amount: Option<u64>,
}

impl TxIn {
    fn into_parts(self) -> Result<(String, String, u64), LedgerError> {
        Ok((
            self.sender.ok_or(LedgerError::MissingField("sender"))?,
            self.recipient.ok_or(LedgerError::MissingField("recipient"))?,
            self.amount.ok_or(LedgerError::MissingField("amount"))?,
        ))
    }
}

#[derive(Serialize)]
struct TxAccepted {
    message: String,
    index: u64,
}

#[derive(Deserialize)]
struct NodesIn {
    nodes: Option<Vec<String>>,
}

#[derive(Serialize)]
struct NodesOut {
    message: &'static str,
    total_nodes: Vec<String>,
}

#[derive(Serialize)]
struct Resolved {
    message: &'static str,
    replaced: bool,
    chain: Vec<Block>,
}

pub fn router<F: PeerFetch>(node: Node<F>) -> Router {
    Router::new()
        .route("/health", get(health::<F>))
        .route("/mine", get(mine::<F>))
        .route("/transactions/new", post(new_transaction::<F>))
        .route("/chain", get(full_chain::<F>))
        .route("/nodes", get(list_nodes::<F>))
        .route("/nodes/register", post(register_nodes::<F>))
        .route("/nodes/resolve", get(consensus::<F>))
        .layer(TraceLayer::new_for_http())
        .with_state(node)
}

async fn health<F: PeerFetch>(State(node): State<Node<F>>) -> Json<Health> {
    Json(Health {
        status: "ok",
        node_id: node.node_id().await,
        difficulty: node.difficulty().await,
        wire_format: WIRE_FORMAT_VERSION,
    })
}

async fn mine<F: PeerFetch>(State(node): State<Node<F>>) -> Result<Json<Forged>, ApiError> {
    match node.mine().await {
        MineOutcome::Forged(block) => Ok(Json(Forged {
            message: "New Block Forged",
            index: block.index,
            transactions: block.transactions,
            proof: block.proof,
            previous_hash: block.previous_hash,
        })),
        MineOutcome::Cancelled => Err(ApiError::Conflict(
            "Mining abandoned: chain was replaced",
        )),
        MineOutcome::Stale => Err(ApiError::Conflict(
            "Mining abandoned: chain tip moved",
        )),
    }
}

async fn new_transaction<F: PeerFetch>(
    State(node): State<Node<F>>,
    Json(tx): Json<TxIn>,
) -> Result<(StatusCode, Json<TxAccepted>), ApiError> {
    let (sender, recipient, amount) = tx.into_parts()?;
    let index = node.new_transaction(sender, recipient, amount).await;
    Ok((
        StatusCode::CREATED,
        Json(TxAccepted {
            message: format!("Transaction will be added to Block {index}"),
            index,
        }),
    ))
}

async fn full_chain<F: PeerFetch>(State(node): State<Node<F>>) -> Json<PeerChain> {
    let chain = node.chain().await;
    Json(PeerChain {
        length: chain.len() as u64,
        chain,
    })
}

async fn list_nodes<F: PeerFetch>(State(node): State<Node<F>>) -> Json<serde_json::Value> {
    Json(json!({ "nodes": node.nodes().await }))
}

async fn register_nodes<F: PeerFetch>(
    State(node): State<Node<F>>,
    Json(body): Json<NodesIn>,
) -> Result<(StatusCode, Json<NodesOut>), ApiError> {
    let nodes = body.nodes.unwrap_or_default();
    let total_nodes = node.register_nodes(nodes.as_slice()).await?;
    info!(added = nodes.len(), total = total_nodes.len(), "registered peers");
    Ok((
        StatusCode::CREATED,
        Json(NodesOut {
            message: "New nodes have been added",
            total_nodes,
        }),
    ))
}

async fn consensus<F: PeerFetch>(State(node): State<Node<F>>) -> Json<Resolved> {
    let replaced = node.resolve_conflicts().await;
    let message = if replaced {
        "Our chain was replaced"
    } else {
        "Our chain is authoritative"
    };
    Json(Resolved {
        message,
        replaced,
        chain: node.chain().await,
    })
}
