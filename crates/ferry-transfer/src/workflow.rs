use std::path::Path;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::debug;

use ferry_core::error::{FerryError, Result};
use ferry_core::traits::WorkflowSource;
use ferry_core::types::{NodeSet, Workflow};

/// Reads workflow definitions from YAML files on disk.
///
/// ```yaml
/// name: Stack to plate reader
/// steps:
///   - name: pick plate
///     node: arm1
///     action: transfer
///     args:
///       source: stack
///       target: plateReader.tray
///   - node: plateReader
///     action: close_tray
/// ```
#[derive(Debug, Clone, Default)]
pub struct FsWorkflowSource;

impl FsWorkflowSource {
    pub fn new() -> Self {
        Self
    }
}

impl WorkflowSource for FsWorkflowSource {
    fn load_workflow(&self, reference: &Path) -> BoxFuture<'_, Result<Workflow>> {
        let path = reference.to_path_buf();
        Box::pin(async move {
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| load_error(&path, format!("cannot read file: {}", e)))?;
            parse_workflow(&content, &path)
        })
    }
}

/// Parse a YAML (or JSON) workflow definition.
///
/// A missing `name` falls back to the file stem of `reference`.
pub fn parse_workflow(content: &str, reference: &Path) -> Result<Workflow> {
    let mut workflow: Workflow = serde_yaml::from_str(content)
        .map_err(|e| load_error(reference, format!("invalid workflow definition: {}", e)))?;

    if workflow.name.trim().is_empty() {
        workflow.name = reference
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
    }
    Ok(workflow)
}

fn load_error(reference: &Path, message: String) -> FerryError {
    FerryError::WorkflowLoad {
        reference: reference.display().to_string(),
        message,
    }
}

/// Loads a workflow through a [`WorkflowSource`] and derives its node set.
pub struct WorkflowLoader {
    source: Arc<dyn WorkflowSource>,
}

impl WorkflowLoader {
    pub fn new(source: Arc<dyn WorkflowSource>) -> Self {
        Self { source }
    }

    pub async fn load(&self, reference: &Path) -> Result<(Workflow, NodeSet)> {
        let workflow = self.source.load_workflow(reference).await.map_err(|e| match e {
            e @ FerryError::WorkflowLoad { .. } => e,
            other => load_error(reference, other.to_string()),
        })?;

        if let Some(idx) = workflow.steps.iter().position(|s| s.node.trim().is_empty()) {
            return Err(load_error(
                reference,
                format!("step {} is not bound to a node", idx),
            ));
        }

        let nodes = workflow.node_set();
        debug!(
            workflow = %workflow.name,
            steps = workflow.steps.len(),
            nodes = ?nodes,
            "Workflow loaded"
        );
        Ok((workflow, nodes))
    }
}
