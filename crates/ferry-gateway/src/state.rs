use std::sync::Arc;

use ferry_core::config::GatewayConfig;
use ferry_transfer::TransferNode;

/// Shared application state for axum handlers.
pub struct AppState {
    pub config: GatewayConfig,
    pub node: Arc<TransferNode>,
}
