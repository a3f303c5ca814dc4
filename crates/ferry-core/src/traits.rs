use std::path::Path;

use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::{Parameters, ResourceState, Workflow, WorkflowResult};

/// Resource service — current fill state of resource instances.
pub trait ResourceService: Send + Sync + 'static {
    /// Fetch the current state of a resource. Never cached.
    fn get_resource(&self, resource_id: &str) -> BoxFuture<'_, Result<ResourceState>>;
}

/// Workcell orchestrator — runs workflows against the physical nodes.
pub trait Orchestrator: Send + Sync + 'static {
    /// Submit a workflow and wait until the orchestrator reports it finished.
    fn submit_workflow(
        &self,
        workflow: Workflow,
        parameters: Parameters,
    ) -> BoxFuture<'_, Result<WorkflowResult>>;
}

/// Workflow source — turns a workflow reference into a parsed workflow.
pub trait WorkflowSource: Send + Sync + 'static {
    fn load_workflow(&self, reference: &Path) -> BoxFuture<'_, Result<Workflow>>;
}
