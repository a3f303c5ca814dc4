use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use ferry_core::config::AppConfig;
use ferry_core::error::{FerryError, Result};
use ferry_core::event::{EventBus, TransferEvent};
use ferry_core::traits::{Orchestrator, ResourceService, WorkflowSource};
use ferry_core::types::{ActionResult, LocationArgument, NodeReservation, TransferId, WorkflowResult};

use crate::coordinator::ReservationCoordinator;
use crate::dispatcher::WorkflowDispatcher;
use crate::precondition::PreconditionChecker;
use crate::registry::ReservationRegistry;
use crate::resolver::{ResolvedEdge, TransferMap};
use crate::workflow::WorkflowLoader;

/// Snapshot of the node's reservation table.
#[derive(Debug, Clone, Serialize)]
pub struct NodeStatus {
    pub name: String,
    pub busy: bool,
    pub reservations: Vec<NodeReservation>,
}

/// A configured edge whose workflow cannot run as configured.
#[derive(Debug)]
pub struct WorkflowIssue {
    pub edge: ResolvedEdge,
    pub error: FerryError,
}

/// The transfer action: resolve, check, load, reserve, dispatch, release.
pub struct TransferNode {
    name: String,
    transfer_map: TransferMap,
    checker: PreconditionChecker,
    loader: WorkflowLoader,
    coordinator: ReservationCoordinator,
    dispatcher: WorkflowDispatcher,
    event_bus: Arc<EventBus>,
}

impl TransferNode {
    /// Build a node from config. The registry is seeded with every
    /// configured node, all free.
    pub fn new(
        config: &AppConfig,
        resources: Arc<dyn ResourceService>,
        orchestrator: Arc<dyn Orchestrator>,
        workflows: Arc<dyn WorkflowSource>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let registry = Arc::new(ReservationRegistry::new(config.node.nodes.iter().cloned()));
        Self {
            name: config.node.name.clone(),
            transfer_map: TransferMap::new(config.node.workflow_directory.clone(), &config.transfer_map),
            checker: PreconditionChecker::new(resources),
            loader: WorkflowLoader::new(workflows),
            coordinator: ReservationCoordinator::new(registry, event_bus.clone()),
            dispatcher: WorkflowDispatcher::new(orchestrator),
            event_bus,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &Arc<ReservationRegistry> {
        self.coordinator.registry()
    }

    pub fn transfer_map(&self) -> &TransferMap {
        &self.transfer_map
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn status(&self) -> NodeStatus {
        let reservations = self.registry().snapshot();
        NodeStatus {
            name: self.name.clone(),
            busy: reservations.iter().any(|r| r.reserved),
            reservations,
        }
    }

    /// Transfer an item between two locations.
    ///
    /// Retryable failures come back as `NotReady`, terminal ones as `Failed`.
    /// Dropping the returned future mid-dispatch still releases the nodes.
    pub async fn transfer(&self, source: &LocationArgument, target: &LocationArgument) -> ActionResult {
        let transfer_id = TransferId::new();
        info!(
            %transfer_id,
            source = %source.location_name,
            target = %target.location_name,
            "Transfer requested"
        );
        self.event_bus.publish(TransferEvent::Started {
            transfer_id,
            source: source.location_name.clone(),
            target: target.location_name.clone(),
        });

        let outcome = self.run(transfer_id, source, target).await;

        let result = match &outcome {
            Ok(workflow) => {
                info!(%transfer_id, workflow_id = %workflow.workflow_id, "Transfer succeeded");
                ActionResult::succeeded(workflow)
            }
            Err(e) if e.is_retryable() => {
                info!(%transfer_id, kind = %e.kind(), error = %e, "Transfer not ready");
                ActionResult::from_error(e)
            }
            Err(e) => {
                warn!(%transfer_id, kind = %e.kind(), error = %e, "Transfer failed");
                ActionResult::from_error(e)
            }
        };

        self.event_bus.publish(TransferEvent::Finished {
            transfer_id,
            outcome: outcome.as_ref().err().map(FerryError::kind),
        });
        result
    }

    async fn run(
        &self,
        transfer_id: TransferId,
        source: &LocationArgument,
        target: &LocationArgument,
    ) -> Result<WorkflowResult> {
        let edge = self
            .transfer_map
            .resolve(&source.location_name, &target.location_name)?;

        let pre = self
            .checker
            .check(&source.resource_id, &target.resource_id)
            .await?;
        info!(
            %transfer_id,
            source_quantity = pre.source.quantity,
            target_quantity = pre.target.quantity,
            "Preconditions passed"
        );

        let (workflow, nodes) = self.loader.load(&edge.workflow).await?;

        let reservation = self.coordinator.acquire(transfer_id, &workflow.name, nodes)?;
        let result = self.dispatcher.dispatch(workflow, edge.parameters).await;
        reservation.release();
        result
    }

    /// Load every configured workflow and report the ones that would fail
    /// before dispatch: unreadable definitions and unknown nodes.
    pub async fn validate_workflows(&self) -> Vec<WorkflowIssue> {
        let mut issues = Vec::new();
        for edge in self.transfer_map.edges() {
            match self.loader.load(&edge.workflow).await {
                Ok((workflow, nodes)) => {
                    let unknown = self.registry().unknown_nodes(&nodes);
                    if !unknown.is_empty() {
                        issues.push(WorkflowIssue {
                            error: FerryError::UnknownNode {
                                workflow: workflow.name,
                                nodes: unknown,
                            },
                            edge,
                        });
                    }
                }
                Err(error) => issues.push(WorkflowIssue { edge, error }),
            }
        }
        issues
    }
}
