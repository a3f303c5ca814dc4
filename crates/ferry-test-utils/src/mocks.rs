use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use futures::future::BoxFuture;
use tokio::sync::{Notify, Semaphore};

use ferry_core::error::{FerryError, Result};
use ferry_core::traits::{Orchestrator, ResourceService, WorkflowSource};
use ferry_core::types::{Parameters, ResourceState, Workflow, WorkflowResult, WorkflowStatus};

/// In-memory resource service. Unknown ids fail with `ResourceQuery`.
#[derive(Default)]
pub struct MockResourceService {
    states: Mutex<HashMap<String, ResourceState>>,
    queries: AtomicUsize,
}

impl MockResourceService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, resource_id: impl Into<String>, state: ResourceState) -> Self {
        self.set(resource_id, state);
        self
    }

    pub fn set(&self, resource_id: impl Into<String>, state: ResourceState) {
        self.states.lock().unwrap().insert(resource_id.into(), state);
    }

    /// Number of `get_resource` calls served so far.
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl ResourceService for MockResourceService {
    fn get_resource(&self, resource_id: &str) -> BoxFuture<'_, Result<ResourceState>> {
        let resource_id = resource_id.to_string();
        Box::pin(async move {
            self.queries.fetch_add(1, Ordering::SeqCst);
            self.states
                .lock()
                .unwrap()
                .get(&resource_id)
                .copied()
                .ok_or_else(|| FerryError::ResourceQuery(format!("resource not found: {}", resource_id)))
        })
    }
}

type ErrorFactory = Box<dyn Fn() -> FerryError + Send + Sync>;

enum Behavior {
    Succeed,
    Fail(ErrorFactory),
    Gated,
}

/// Scripted orchestrator that records every submission.
pub struct MockOrchestrator {
    behavior: Behavior,
    calls: Mutex<Vec<(Workflow, Parameters)>>,
    submitted: Notify,
    gate: Semaphore,
    next_id: AtomicUsize,
}

impl MockOrchestrator {
    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: Mutex::new(Vec::new()),
            submitted: Notify::new(),
            gate: Semaphore::new(0),
            next_id: AtomicUsize::new(1),
        }
    }

    /// Every workflow completes immediately.
    pub fn succeeding() -> Self {
        Self::with_behavior(Behavior::Succeed)
    }

    /// Every workflow fails with a `Dispatch` error.
    pub fn failing() -> Self {
        Self::failing_with(|| FerryError::Dispatch("workflow failed on the workcell".into()))
    }

    pub fn failing_with(f: impl Fn() -> FerryError + Send + Sync + 'static) -> Self {
        Self::with_behavior(Behavior::Fail(Box::new(f)))
    }

    /// Submissions block until [`open`](Self::open) lets them through.
    pub fn gated() -> Self {
        Self::with_behavior(Behavior::Gated)
    }

    pub fn calls(&self) -> Vec<(Workflow, Parameters)> {
        self.calls.lock().unwrap().clone()
    }

    /// Wait until at least `n` submissions have been recorded.
    pub async fn wait_for_calls(&self, n: usize) {
        loop {
            let notified = self.submitted.notified();
            if self.calls.lock().unwrap().len() >= n {
                return;
            }
            notified.await;
        }
    }

    /// Let `n` gated submissions complete.
    pub fn open(&self, n: usize) {
        self.gate.add_permits(n);
    }

    fn completed(&self, workflow: &Workflow) -> WorkflowResult {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        WorkflowResult {
            workflow_id: format!("wf-{}", id),
            status: WorkflowStatus::Completed,
            record: serde_json::json!({ "name": workflow.name }),
        }
    }
}

impl Orchestrator for MockOrchestrator {
    fn submit_workflow(
        &self,
        workflow: Workflow,
        parameters: Parameters,
    ) -> BoxFuture<'_, Result<WorkflowResult>> {
        Box::pin(async move {
            self.calls
                .lock()
                .unwrap()
                .push((workflow.clone(), parameters));
            self.submitted.notify_waiters();

            match &self.behavior {
                Behavior::Succeed => Ok(self.completed(&workflow)),
                Behavior::Fail(f) => Err(f()),
                Behavior::Gated => {
                    let permit = self
                        .gate
                        .acquire()
                        .await
                        .map_err(|e| FerryError::Dispatch(e.to_string()))?;
                    permit.forget();
                    Ok(self.completed(&workflow))
                }
            }
        })
    }
}

/// Workflows keyed by the exact path they are requested under.
#[derive(Default)]
pub struct StaticWorkflowSource {
    workflows: HashMap<PathBuf, Workflow>,
}

impl StaticWorkflowSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<PathBuf>, workflow: Workflow) -> Self {
        self.workflows.insert(path.into(), workflow);
        self
    }
}

impl WorkflowSource for StaticWorkflowSource {
    fn load_workflow(&self, reference: &Path) -> BoxFuture<'_, Result<Workflow>> {
        let found = self.workflows.get(reference).cloned();
        let reference = reference.display().to_string();
        Box::pin(async move {
            found.ok_or_else(|| FerryError::WorkflowLoad {
                reference,
                message: "no such workflow".into(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn gated_orchestrator_waits_for_open() {
        let orch = Arc::new(MockOrchestrator::gated());
        let task = {
            let orch = orch.clone();
            tokio::spawn(async move {
                orch.submit_workflow(Workflow::new("wf", vec![]), Parameters::new())
                    .await
            })
        };
        orch.wait_for_calls(1).await;
        assert!(!task.is_finished());
        orch.open(1);
        let result = task.await.unwrap().unwrap();
        assert_eq!(result.status, WorkflowStatus::Completed);
        assert_eq!(orch.calls().len(), 1);
    }

    #[tokio::test]
    async fn wait_for_calls_sees_concurrent_submissions() {
        let orch = Arc::new(MockOrchestrator::gated());
        let tasks: Vec<_> = (0..2)
            .map(|i| {
                let orch = orch.clone();
                tokio::spawn(async move {
                    orch.submit_workflow(Workflow::new(format!("wf-{}", i), vec![]), Parameters::new())
                        .await
                })
            })
            .collect();

        orch.wait_for_calls(2).await;
        assert_eq!(orch.calls().len(), 2);
        orch.open(2);
        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }
    }

    #[tokio::test]
    async fn resource_service_counts_queries() {
        let svc = MockResourceService::new().with("a", ResourceState::new(1, 2));
        assert_eq!(svc.get_resource("a").await.unwrap().quantity, 1);
        assert!(svc.get_resource("b").await.is_err());
        assert_eq!(svc.queries(), 2);
    }
}
