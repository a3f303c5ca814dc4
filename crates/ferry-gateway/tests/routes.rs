//! Route tests driven through the router with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use ferry_core::config::GatewayConfig;
use ferry_core::event::EventBus;
use ferry_core::types::ResourceState;
use ferry_gateway::{router, AppState};
use ferry_test_utils::{
    sample_config, stack_to_reader_workflow, MockOrchestrator, MockResourceService,
    StaticWorkflowSource,
};
use ferry_transfer::TransferNode;
use tower::ServiceExt;

fn app(token: Option<&str>) -> Router {
    let config = sample_config();
    let resources = MockResourceService::new()
        .with("plate-1", ResourceState::new(1, 1))
        .with("reader-slot", ResourceState::new(0, 1))
        .with("empty-stack", ResourceState::new(0, 10));
    let workflows = StaticWorkflowSource::new()
        .with("workflows/stack_to_reader.yaml", stack_to_reader_workflow());
    let node = TransferNode::new(
        &config,
        Arc::new(resources),
        Arc::new(MockOrchestrator::succeeding()),
        Arc::new(workflows),
        Arc::new(EventBus::default()),
    );
    router(Arc::new(AppState {
        config: GatewayConfig {
            token: token.map(String::from),
            ..Default::default()
        },
        node: Arc::new(node),
    }))
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn transfer_request(source: (&str, &str), target: (&str, &str)) -> Request<Body> {
    let body = serde_json::json!({
        "source": { "location_name": source.0, "resource_id": source.1 },
        "target": { "location_name": target.0, "resource_id": target.1 },
    });
    Request::post("/action/transfer")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_needs_no_token() {
    let response = app(Some("s3cret"))
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn test_status_requires_token() {
    let response = app(Some("s3cret"))
        .oneshot(Request::get("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app(Some("s3cret"))
        .oneshot(
            Request::get("/status")
                .header("authorization", "Bearer s3cret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["name"], "transfer_node");
    assert_eq!(body["busy"], false);
    assert_eq!(body["reservations"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_info_lists_nodes_and_edges() {
    let response = app(None)
        .oneshot(Request::get("/info").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["nodes"][0], "arm1");
    let transfers = body["transfers"].as_array().unwrap();
    assert_eq!(transfers.len(), 3);
    assert_eq!(transfers[0]["source"], "reader");
    assert_eq!(transfers[0]["target"], "stack");
}

#[tokio::test]
async fn test_transfer_succeeds() {
    let response = app(None)
        .oneshot(transfer_request(("stack", "plate-1"), ("reader", "reader-slot")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "succeeded");
    assert_eq!(body["data"]["workflow"]["status"], "completed");
}

#[tokio::test]
async fn test_transfer_from_empty_source_fails() {
    let response = app(None)
        .oneshot(transfer_request(("stack", "empty-stack"), ("reader", "reader-slot")))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["status"], "failed");
    assert_eq!(body["errors"][0]["kind"], "source_empty");
}

#[tokio::test]
async fn test_malformed_transfer_body_is_rejected() {
    let request = Request::post("/action/transfer")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"source": "stack"}"#))
        .unwrap();
    let response = app(None).oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());
}
