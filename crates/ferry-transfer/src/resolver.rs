use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use ferry_core::config::{TransferEdgeConfig, TransferMapConfig};
use ferry_core::error::{FerryError, Result};
use ferry_core::types::Parameters;

/// A transfer edge with its workflow reference resolved to a path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedEdge {
    pub source: String,
    pub target: String,
    pub workflow: PathBuf,
    pub parameters: Parameters,
}

/// Immutable (source, target) -> edge lookup, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct TransferMap {
    workflow_directory: PathBuf,
    edges: HashMap<(String, String), TransferEdgeConfig>,
}

impl TransferMap {
    pub fn new(workflow_directory: impl Into<PathBuf>, config: &TransferMapConfig) -> Self {
        let edges = config
            .iter()
            .flat_map(|(source, targets)| {
                targets
                    .iter()
                    .map(move |(target, edge)| ((source.clone(), target.clone()), edge.clone()))
            })
            .collect();
        Self {
            workflow_directory: workflow_directory.into(),
            edges,
        }
    }

    pub fn workflow_directory(&self) -> &Path {
        &self.workflow_directory
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Look up the edge for an ordered pair of location names.
    pub fn resolve(&self, source: &str, target: &str) -> Result<ResolvedEdge> {
        let edge = self
            .edges
            .get(&(source.to_string(), target.to_string()))
            .ok_or_else(|| FerryError::NoTransferPath {
                from: source.to_string(),
                to: target.to_string(),
            })?;
        Ok(self.materialize(source, target, edge))
    }

    /// Every configured edge, sorted by (source, target).
    pub fn edges(&self) -> Vec<ResolvedEdge> {
        let mut out: Vec<ResolvedEdge> = self
            .edges
            .iter()
            .map(|((s, t), edge)| self.materialize(s, t, edge))
            .collect();
        out.sort_by(|a, b| (&a.source, &a.target).cmp(&(&b.source, &b.target)));
        out
    }

    fn materialize(&self, source: &str, target: &str, edge: &TransferEdgeConfig) -> ResolvedEdge {
        ResolvedEdge {
            source: source.to_string(),
            target: target.to_string(),
            workflow: self.workflow_directory.join(&edge.workflow),
            parameters: edge.parameters.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn map() -> TransferMap {
        let mut targets = BTreeMap::new();
        let mut parameters = Parameters::new();
        parameters.insert("plate_type".into(), serde_json::json!("96well"));
        targets.insert(
            "reader".to_string(),
            TransferEdgeConfig {
                workflow: "stack_to_reader.yaml".into(),
                parameters,
            },
        );
        let mut config = TransferMapConfig::new();
        config.insert("stack".to_string(), targets);
        TransferMap::new("/opt/workflows", &config)
    }

    #[test]
    fn test_resolve_joins_workflow_directory() {
        let edge = map().resolve("stack", "reader").unwrap();
        assert_eq!(edge.workflow, PathBuf::from("/opt/workflows/stack_to_reader.yaml"));
        assert_eq!(edge.parameters["plate_type"], "96well");
    }

    #[test]
    fn test_resolve_is_directional() {
        let err = map().resolve("reader", "stack").unwrap_err();
        assert!(matches!(
            err,
            FerryError::NoTransferPath { ref from, ref to } if from == "reader" && to == "stack"
        ));
    }

    #[test]
    fn test_unknown_source() {
        assert!(map().resolve("incubator", "reader").is_err());
    }

    #[test]
    fn test_edges_listing() {
        let m = map();
        assert_eq!(m.len(), 1);
        let edges = m.edges();
        assert_eq!(edges[0].source, "stack");
        assert_eq!(edges[0].target, "reader");
    }
}
