use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use reqwest::{Client, Response, Url};
use serde::Serialize;
use tracing::{debug, info};

use ferry_core::config::WorkcellConfig;
use ferry_core::error::{FerryError, Result};
use ferry_core::traits::Orchestrator;
use ferry_core::types::{Parameters, Workflow, WorkflowResult, WorkflowStatus};

use crate::{endpoint, parse_base_url};

#[derive(Serialize)]
struct SubmitRequest<'a> {
    workflow: &'a Workflow,
    parameters: &'a Parameters,
}

/// Submits workflows to the workcell manager and polls them to completion.
pub struct HttpWorkcellClient {
    http: Client,
    base_url: Url,
    poll_interval: Duration,
    await_timeout: Option<Duration>,
}

impl HttpWorkcellClient {
    pub fn new(config: &WorkcellConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FerryError::Config(format!("workcell client: {}", e)))?;
        Ok(Self {
            http,
            base_url: parse_base_url(&config.url)?,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            await_timeout: config.await_timeout_secs.map(Duration::from_secs),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    async fn submit(&self, workflow: &Workflow, parameters: &Parameters) -> Result<WorkflowResult> {
        let response = self
            .http
            .post(endpoint(&self.base_url, &["workflow"]))
            .json(&SubmitRequest {
                workflow,
                parameters,
            })
            .send()
            .await
            .map_err(|e| FerryError::Dispatch(format!("submit {}: {}", workflow.name, e)))?;
        parse_run(response).await
    }

    async fn fetch(&self, workflow_id: &str) -> Result<WorkflowResult> {
        let response = self
            .http
            .get(endpoint(&self.base_url, &["workflow", workflow_id]))
            .send()
            .await
            .map_err(|e| FerryError::Dispatch(format!("query {}: {}", workflow_id, e)))?;
        parse_run(response).await
    }
}

/// Decode a run record, keeping the full body alongside id and status.
async fn parse_run(response: Response) -> Result<WorkflowResult> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(FerryError::Dispatch(format!(
            "workcell returned HTTP {}: {}",
            status.as_u16(),
            body.trim()
        )));
    }

    let record: serde_json::Value = response
        .json()
        .await
        .map_err(|e| FerryError::Dispatch(format!("invalid run record: {}", e)))?;

    let workflow_id = record
        .get("workflow_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| FerryError::Dispatch("run record has no workflow_id".into()))?
        .to_string();
    let status = record
        .get("status")
        .cloned()
        .map(serde_json::from_value::<WorkflowStatus>)
        .transpose()?
        .unwrap_or(WorkflowStatus::Unknown);

    Ok(WorkflowResult {
        workflow_id,
        status,
        record,
    })
}

impl Orchestrator for HttpWorkcellClient {
    fn submit_workflow(
        &self,
        workflow: Workflow,
        parameters: Parameters,
    ) -> BoxFuture<'_, Result<WorkflowResult>> {
        Box::pin(async move {
            let deadline = self.await_timeout.map(|t| Instant::now() + t);
            let mut run = self.submit(&workflow, &parameters).await?;
            info!(workflow = %workflow.name, workflow_id = %run.workflow_id, "Workflow submitted");

            loop {
                match run.status {
                    WorkflowStatus::Completed => return Ok(run),
                    WorkflowStatus::Failed | WorkflowStatus::Cancelled => {
                        return Err(FerryError::Dispatch(format!(
                            "workflow {} ended as {:?}",
                            run.workflow_id, run.status
                        )));
                    }
                    _ => {}
                }

                if deadline.is_some_and(|d| Instant::now() >= d) {
                    return Err(FerryError::Dispatch(format!(
                        "timed out waiting for workflow {}",
                        run.workflow_id
                    )));
                }

                tokio::time::sleep(self.poll_interval).await;
                run = self.fetch(&run.workflow_id).await?;
                debug!(workflow_id = %run.workflow_id, status = ?run.status, "Polled workflow");
            }
        })
    }
}
