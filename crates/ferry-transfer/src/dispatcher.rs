use std::sync::Arc;

use tracing::{info, warn};

use ferry_core::error::{FerryError, Result};
use ferry_core::traits::Orchestrator;
use ferry_core::types::{Parameters, Workflow, WorkflowResult};

/// Hands workflows to the workcell orchestrator.
pub struct WorkflowDispatcher {
    orchestrator: Arc<dyn Orchestrator>,
}

impl WorkflowDispatcher {
    pub fn new(orchestrator: Arc<dyn Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Submit and wait for completion. Every orchestrator failure surfaces
    /// as `Dispatch`.
    pub async fn dispatch(
        &self,
        workflow: Workflow,
        parameters: Parameters,
    ) -> Result<WorkflowResult> {
        let name = workflow.name.clone();
        match self.orchestrator.submit_workflow(workflow, parameters).await {
            Ok(result) => {
                info!(
                    workflow = %name,
                    workflow_id = %result.workflow_id,
                    status = ?result.status,
                    "Workflow completed"
                );
                Ok(result)
            }
            Err(e) => {
                warn!(workflow = %name, error = %e, "Workflow dispatch failed");
                Err(match e {
                    e @ FerryError::Dispatch(_) => e,
                    other => FerryError::Dispatch(other.to_string()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::error::ErrorKind;
    use ferry_core::types::Step;
    use ferry_test_utils::MockOrchestrator;

    #[tokio::test]
    async fn passes_parameters_through() {
        let orchestrator = Arc::new(MockOrchestrator::succeeding());
        let dispatcher = WorkflowDispatcher::new(orchestrator.clone());

        let mut params = Parameters::new();
        params.insert("plate_type".into(), serde_json::json!("96well"));
        let wf = Workflow::new("wf", vec![Step::new("arm1")]);

        let result = dispatcher.dispatch(wf, params.clone()).await.unwrap();
        assert!(result.status.is_terminal());

        let calls = orchestrator.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.name, "wf");
        assert_eq!(calls[0].1, params);
    }

    #[tokio::test]
    async fn other_errors_become_dispatch_errors() {
        let orchestrator = Arc::new(MockOrchestrator::failing_with(|| {
            FerryError::Io(std::io::Error::other("connection reset"))
        }));
        let dispatcher = WorkflowDispatcher::new(orchestrator);

        let err = dispatcher
            .dispatch(Workflow::new("wf", vec![]), Parameters::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DispatchError);
        assert!(err.to_string().contains("connection reset"));
    }
}
