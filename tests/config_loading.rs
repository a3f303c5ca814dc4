use std::path::Path;

use ferry_core::config::AppConfig;
use ferry_core::error::FerryError;
use ferry_test_utils::{write_config, SAMPLE_CONFIG};

#[test]
fn test_load_full_config_from_file() {
    let toml_content = r#"
[node]
name = "plate_mover"
workflow_directory = "/opt/lab/workflows"
nodes = ["arm1", "plateReader"]

[resources]
url = "http://resources.lab:8003"
timeout_secs = 3

[workcell]
url = "http://workcell.lab:8005"
timeout_secs = 15
poll_interval_ms = 250
await_timeout_secs = 600

[gateway]
bind = "0.0.0.0:2100"
token = "lab-token"

[transfer_map.stack.reader]
workflow = "stack_to_reader.yaml"
parameters = { plate_type = "384well", gripper = { width = 85.5 } }
"#;
    let tmp = write_config(toml_content);
    let config = AppConfig::load(tmp.path()).unwrap();

    assert_eq!(config.node.name, "plate_mover");
    assert_eq!(config.node.nodes, vec!["arm1", "plateReader"]);
    assert_eq!(config.resources.timeout_secs, 3);
    assert_eq!(config.workcell.poll_interval_ms, 250);
    assert_eq!(config.workcell.await_timeout_secs, Some(600));
    assert_eq!(config.gateway.bind, "0.0.0.0:2100");
    assert_eq!(config.gateway.token.as_deref(), Some("lab-token"));

    let edge = &config.transfer_map["stack"]["reader"];
    assert_eq!(edge.parameters["gripper"]["width"], serde_json::json!(85.5));
}

#[test]
fn test_sample_config_loads() {
    let tmp = write_config(SAMPLE_CONFIG);
    let config = AppConfig::load(tmp.path()).unwrap();
    assert_eq!(config.node.nodes.len(), 4);
    assert_eq!(config.transfer_map.len(), 2);
    assert_eq!(config.transfer_map["stack"].len(), 2);
}

#[test]
fn test_env_var_expansion_in_file() {
    std::env::set_var("FERRY_TEST_WORKCELL_URL", "http://expanded:8005");
    let tmp = write_config(
        r#"
[resources]
url = "http://resources:8003"

[workcell]
url = "${FERRY_TEST_WORKCELL_URL}"
"#,
    );
    let config = AppConfig::load(tmp.path()).unwrap();
    assert_eq!(config.workcell.url, "http://expanded:8005");
    std::env::remove_var("FERRY_TEST_WORKCELL_URL");
}

#[test]
fn test_missing_file_is_not_found() {
    let err = AppConfig::load(Path::new("/nonexistent/ferry.toml")).unwrap_err();
    assert!(matches!(err, FerryError::ConfigNotFound(_)));
}

#[test]
fn test_missing_required_section_is_config_error() {
    let tmp = write_config("[resources]\nurl = \"http://r\"\n");
    let err = AppConfig::load(tmp.path()).unwrap_err();
    assert!(matches!(err, FerryError::Config(_)));
}

#[test]
fn test_edge_without_workflow_is_rejected() {
    let tmp = write_config(
        r#"
[resources]
url = "http://r"

[workcell]
url = "http://w"

[transfer_map.stack.reader]
workflow = ""
"#,
    );
    let err = AppConfig::load(tmp.path()).unwrap_err();
    assert!(err.to_string().contains("transfer_map.stack.reader"));
}

#[tokio::test]
async fn test_shipped_config_and_workflows_are_consistent() {
    use std::sync::Arc;

    use ferry_core::event::EventBus;
    use ferry_test_utils::{MockOrchestrator, MockResourceService};
    use ferry_transfer::{FsWorkflowSource, TransferNode};

    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut config = AppConfig::load(&root.join("ferry.toml")).unwrap();
    config.node.workflow_directory = root.join(&config.node.workflow_directory);

    let node = TransferNode::new(
        &config,
        Arc::new(MockResourceService::new()),
        Arc::new(MockOrchestrator::succeeding()),
        Arc::new(FsWorkflowSource::new()),
        Arc::new(EventBus::default()),
    );
    let issues = node.validate_workflows().await;
    assert!(issues.is_empty(), "{:?}", issues);
    assert_eq!(node.transfer_map().len(), 3);
}
