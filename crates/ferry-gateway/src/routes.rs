use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::debug;

use ferry_core::types::{ActionResult, LocationArgument};
use ferry_transfer::node::NodeStatus;

use crate::middleware::Authenticated;
use crate::state::AppState;

// GET /health — no auth required
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// GET /status
pub async fn status(
    _auth: Authenticated,
    State(state): State<Arc<AppState>>,
) -> Json<NodeStatus> {
    Json(state.node.status())
}

// GET /info
pub async fn info(
    _auth: Authenticated,
    State(state): State<Arc<AppState>>,
) -> Json<serde_json::Value> {
    let node = &state.node;
    Json(serde_json::json!({
        "name": node.name(),
        "nodes": node.registry().known_nodes(),
        "transfers": node.transfer_map().edges(),
        "actions": ["transfer"],
    }))
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub source: LocationArgument,
    pub target: LocationArgument,
}

// POST /action/transfer
pub async fn transfer(
    _auth: Authenticated,
    State(state): State<Arc<AppState>>,
    Json(body): Json<TransferRequest>,
) -> Json<ActionResult> {
    debug!(
        source = %body.source.location_name,
        target = %body.target.location_name,
        "Transfer action received"
    );
    Json(state.node.transfer(&body.source, &body.target).await)
}
