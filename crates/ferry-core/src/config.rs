use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FerryError, Result};
use crate::types::Parameters;

/// Top-level Ferry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub node: NodeConfig,
    pub resources: ResourceServiceConfig,
    pub workcell: WorkcellConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// source location -> target location -> edge
    #[serde(default)]
    pub transfer_map: TransferMapConfig,
}

pub type TransferMapConfig = BTreeMap<String, BTreeMap<String, TransferEdgeConfig>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default = "default_node_name")]
    pub name: String,
    /// Directory that workflow references are resolved against.
    #[serde(default = "default_workflow_directory")]
    pub workflow_directory: PathBuf,
    /// Every node that transfer workflows may reserve.
    #[serde(default)]
    pub nodes: Vec<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: default_node_name(),
            workflow_directory: default_workflow_directory(),
            nodes: vec![],
        }
    }
}

fn default_node_name() -> String { "transfer_node".to_string() }
fn default_workflow_directory() -> PathBuf { PathBuf::from("workflows") }

/// Resource service connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceServiceConfig {
    pub url: String,
    #[serde(default = "default_resource_timeout")]
    pub timeout_secs: u64,
}

fn default_resource_timeout() -> u64 { 10 }

/// Workcell (orchestrator) connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkcellConfig {
    pub url: String,
    /// Per-request HTTP timeout.
    #[serde(default = "default_workcell_timeout")]
    pub timeout_secs: u64,
    /// Delay between workflow status polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Give up waiting for a submitted workflow after this long. None = wait forever.
    #[serde(default)]
    pub await_timeout_secs: Option<u64>,
}

fn default_workcell_timeout() -> u64 { 30 }
fn default_poll_interval() -> u64 { 1000 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Bearer token required on every route except /health.
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            token: None,
        }
    }
}

fn default_bind() -> String { "127.0.0.1:2000".to_string() }

/// A configured transfer between two locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferEdgeConfig {
    /// Workflow file, relative to `node.workflow_directory`.
    pub workflow: String,
    #[serde(default)]
    pub parameters: Parameters,
}

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| FerryError::ConfigNotFound(path.display().to_string()))?;

        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(&content);

        let config: Self =
            toml::from_str(&expanded).map_err(|e| FerryError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Copy safe to print: secrets replaced with a placeholder.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.gateway.token.is_some() {
            config.gateway.token = Some("[redacted]".to_string());
        }
        config
    }

    /// Reject configurations the node cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.resources.url.trim().is_empty() {
            return Err(FerryError::Config("resources.url is empty".into()));
        }
        if self.workcell.url.trim().is_empty() {
            return Err(FerryError::Config("workcell.url is empty".into()));
        }

        let mut seen = HashSet::new();
        for node in &self.node.nodes {
            if node.trim().is_empty() {
                return Err(FerryError::Config("node.nodes contains an empty id".into()));
            }
            if !seen.insert(node.as_str()) {
                return Err(FerryError::Config(format!(
                    "node.nodes lists '{}' more than once",
                    node
                )));
            }
        }

        for (source, targets) in &self.transfer_map {
            for (target, edge) in targets {
                if edge.workflow.trim().is_empty() {
                    return Err(FerryError::Config(format!(
                        "transfer_map.{}.{} has no workflow",
                        source, target
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    // Keep original if env var not set
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}
