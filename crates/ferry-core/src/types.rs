use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ErrorKind, FerryError};

/// Unique identifier of one transfer attempt.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct TransferId(pub Uuid);

impl TransferId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransferId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named location and the resource instance held there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationArgument {
    pub location_name: String,
    pub resource_id: String,
}

impl LocationArgument {
    pub fn new(location_name: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            location_name: location_name.into(),
            resource_id: resource_id.into(),
        }
    }
}

/// Current fill state of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceState {
    pub quantity: u64,
    /// `None` means unbounded.
    #[serde(default)]
    pub capacity: Option<u64>,
}

impl ResourceState {
    pub fn new(quantity: u64, capacity: u64) -> Self {
        Self {
            quantity,
            capacity: Some(capacity),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.quantity == 0
    }

    pub fn is_full(&self) -> bool {
        self.capacity.is_some_and(|c| self.quantity >= c)
    }
}

/// Parameters applied to a workflow when it is dispatched.
pub type Parameters = BTreeMap<String, serde_json::Value>;

/// Distinct node identifiers, ordered for stable logs and messages.
pub type NodeSet = BTreeSet<String>;

/// A single workflow step, bound to exactly one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub name: Option<String>,
    pub node: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub args: serde_json::Map<String, serde_json::Value>,
}

impl Step {
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            name: None,
            node: node.into(),
            action: None,
            args: serde_json::Map::new(),
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }
}

/// An ordered list of steps executed by the workcell orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Workflow {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    /// Distinct nodes referenced by any step.
    pub fn node_set(&self) -> NodeSet {
        self.steps.iter().map(|s| s.node.clone()).collect()
    }
}

/// Lifecycle status reported by the workcell for a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Queued,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl WorkflowStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WorkflowStatus::Completed | WorkflowStatus::Failed | WorkflowStatus::Cancelled
        )
    }
}

/// A workflow run as returned by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub workflow_id: String,
    pub status: WorkflowStatus,
    /// The full run record, kept verbatim for the caller.
    #[serde(default)]
    pub record: serde_json::Value,
}

/// One error attached to a failed or not-ready action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&FerryError> for ActionError {
    fn from(e: &FerryError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

/// Outcome of a node action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionResult {
    Succeeded { data: serde_json::Value },
    Failed { errors: Vec<ActionError> },
    NotReady { errors: Vec<ActionError> },
}

impl ActionResult {
    pub fn succeeded(workflow: &WorkflowResult) -> Self {
        ActionResult::Succeeded {
            data: serde_json::json!({ "workflow": workflow }),
        }
    }

    /// Retryable errors become `NotReady`, everything else `Failed`.
    pub fn from_error(e: &FerryError) -> Self {
        let errors = vec![ActionError::from(e)];
        if e.is_retryable() {
            ActionResult::NotReady { errors }
        } else {
            ActionResult::Failed { errors }
        }
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, ActionResult::Succeeded { .. })
    }

    /// Kind of the first error, if any.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            ActionResult::Succeeded { .. } => None,
            ActionResult::Failed { errors } | ActionResult::NotReady { errors } => {
                errors.first().map(|e| e.kind)
            }
        }
    }
}

/// Reservation state of a single node, for status reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeReservation {
    pub node: String,
    pub reserved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder: Option<TransferId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved_at: Option<DateTime<Utc>>,
}
