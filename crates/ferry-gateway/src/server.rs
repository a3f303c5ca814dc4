use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use ferry_core::config::GatewayConfig;
use ferry_transfer::TransferNode;

use crate::routes;
use crate::state::AppState;

/// Build the HTTP router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/status", get(routes::status))
        .route("/info", get(routes::info))
        .route("/action/transfer", post(routes::transfer))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// HTTP gateway for a transfer node, built on axum.
pub struct GatewayServer {
    config: GatewayConfig,
    node: Arc<TransferNode>,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig, node: Arc<TransferNode>) -> Self {
        Self { config, node }
    }

    /// Run the gateway server until the cancellation token is triggered.
    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let app = router(Arc::new(AppState {
            config: self.config.clone(),
            node: self.node.clone(),
        }));

        let listener = TcpListener::bind(&self.config.bind).await?;
        info!(bind = %self.config.bind, node = %self.node.name(), "Gateway listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("Gateway shut down");
        Ok(())
    }
}
