use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FerryError {
    // Precondition errors
    #[error("Resource manager: plate does not exist at source ({resource_id})")]
    SourceEmpty { resource_id: String },

    #[error("Resource manager: target is occupied by another plate ({resource_id})")]
    TargetFull { resource_id: String },

    #[error("Resource query failed: {0}")]
    ResourceQuery(String),

    // Transfer map errors
    #[error("No transfer path configured from '{from}' to '{to}'")]
    NoTransferPath { from: String, to: String },

    // Workflow errors
    #[error("Failed to load workflow {reference}: {message}")]
    WorkflowLoad { reference: String, message: String },

    // Reservation errors
    #[error("Nodes are busy: {}", .nodes.join(", "))]
    NodesBusy { nodes: Vec<String> },

    #[error("Workflow {workflow} references unknown nodes: {}", .nodes.join(", "))]
    UnknownNode { workflow: String, nodes: Vec<String> },

    // Orchestrator errors
    #[error("Workflow dispatch failed: {0}")]
    Dispatch(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FerryError>;

/// Classification of a transfer failure as reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SourceEmpty,
    TargetFull,
    NoTransferPath,
    WorkflowLoadError,
    NodesBusy,
    UnknownNode,
    DispatchError,
    ResourceQueryError,
    Internal,
}

impl ErrorKind {
    /// Retryable kinds may succeed later without any configuration or
    /// physical change made by the caller.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::TargetFull | ErrorKind::NodesBusy)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::SourceEmpty => "source_empty",
            ErrorKind::TargetFull => "target_full",
            ErrorKind::NoTransferPath => "no_transfer_path",
            ErrorKind::WorkflowLoadError => "workflow_load_error",
            ErrorKind::NodesBusy => "nodes_busy",
            ErrorKind::UnknownNode => "unknown_node",
            ErrorKind::DispatchError => "dispatch_error",
            ErrorKind::ResourceQueryError => "resource_query_error",
            ErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

impl FerryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FerryError::SourceEmpty { .. } => ErrorKind::SourceEmpty,
            FerryError::TargetFull { .. } => ErrorKind::TargetFull,
            FerryError::ResourceQuery(_) => ErrorKind::ResourceQueryError,
            FerryError::NoTransferPath { .. } => ErrorKind::NoTransferPath,
            FerryError::WorkflowLoad { .. } => ErrorKind::WorkflowLoadError,
            FerryError::NodesBusy { .. } => ErrorKind::NodesBusy,
            FerryError::UnknownNode { .. } => ErrorKind::UnknownNode,
            FerryError::Dispatch(_) => ErrorKind::DispatchError,
            FerryError::Config(_)
            | FerryError::ConfigNotFound(_)
            | FerryError::Io(_)
            | FerryError::Json(_) => ErrorKind::Internal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds() {
        assert!(ErrorKind::TargetFull.is_retryable());
        assert!(ErrorKind::NodesBusy.is_retryable());
        assert!(!ErrorKind::SourceEmpty.is_retryable());
        assert!(!ErrorKind::NoTransferPath.is_retryable());
        assert!(!ErrorKind::WorkflowLoadError.is_retryable());
        assert!(!ErrorKind::DispatchError.is_retryable());
        assert!(!ErrorKind::UnknownNode.is_retryable());
    }

    #[test]
    fn nodes_busy_message_lists_nodes() {
        let err = FerryError::NodesBusy {
            nodes: vec!["arm1".into(), "plateReader".into()],
        };
        assert_eq!(err.to_string(), "Nodes are busy: arm1, plateReader");
        assert_eq!(err.kind(), ErrorKind::NodesBusy);
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::WorkflowLoadError).unwrap();
        assert_eq!(json, "\"workflow_load_error\"");
        assert_eq!(ErrorKind::WorkflowLoadError.to_string(), "workflow_load_error");
    }
}
