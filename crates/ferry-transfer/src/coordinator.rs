use std::sync::Arc;

use tracing::{debug, info, warn};

use ferry_core::error::{FerryError, Result};
use ferry_core::event::{EventBus, TransferEvent};
use ferry_core::types::{NodeSet, TransferId};

use crate::registry::{Conflict, ReservationRegistry};

/// Acquires and releases node sets against the shared registry.
pub struct ReservationCoordinator {
    registry: Arc<ReservationRegistry>,
    event_bus: Arc<EventBus>,
}

impl ReservationCoordinator {
    pub fn new(registry: Arc<ReservationRegistry>, event_bus: Arc<EventBus>) -> Self {
        Self {
            registry,
            event_bus,
        }
    }

    pub fn registry(&self) -> &Arc<ReservationRegistry> {
        &self.registry
    }

    /// Reserve every node in `nodes` or none of them.
    ///
    /// Busy nodes yield `NodesBusy`; nodes missing from the registry yield
    /// `UnknownNode`. In both cases the registry is left as it was. The
    /// returned guard releases the whole set when dropped.
    pub fn acquire(
        &self,
        transfer_id: TransferId,
        workflow: &str,
        nodes: NodeSet,
    ) -> Result<Reservation> {
        debug!(%transfer_id, nodes = ?nodes, "Acquiring nodes");

        match self.registry.test_and_set(&nodes, transfer_id) {
            Ok(()) => {
                info!(%transfer_id, nodes = ?nodes, "Nodes reserved");
                self.event_bus.publish(TransferEvent::NodesReserved {
                    transfer_id,
                    nodes: nodes.clone(),
                });
                Ok(Reservation {
                    registry: self.registry.clone(),
                    event_bus: self.event_bus.clone(),
                    transfer_id,
                    nodes,
                    released: false,
                })
            }
            Err(Conflict::Busy(busy)) => {
                info!(%transfer_id, busy = ?busy, "Nodes busy, reservation rejected");
                self.event_bus.publish(TransferEvent::Rejected {
                    transfer_id,
                    busy: busy.clone(),
                });
                Err(FerryError::NodesBusy { nodes: busy })
            }
            Err(Conflict::Unknown(unknown)) => {
                warn!(%transfer_id, workflow, unknown = ?unknown, "Workflow references unknown nodes");
                Err(FerryError::UnknownNode {
                    workflow: workflow.to_string(),
                    nodes: unknown,
                })
            }
        }
    }
}

/// Exclusive hold on a node set. Released exactly once: explicitly via
/// [`Reservation::release`] or implicitly on drop, whichever comes first.
#[must_use = "dropping a reservation releases its nodes immediately"]
pub struct Reservation {
    registry: Arc<ReservationRegistry>,
    event_bus: Arc<EventBus>,
    transfer_id: TransferId,
    nodes: NodeSet,
    released: bool,
}

impl Reservation {
    pub fn nodes(&self) -> &NodeSet {
        &self.nodes
    }

    pub fn transfer_id(&self) -> TransferId {
        self.transfer_id
    }

    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.registry.clear(&self.nodes);
        debug!(transfer_id = %self.transfer_id, nodes = ?self.nodes, "Nodes released");
        self.event_bus.publish(TransferEvent::NodesReleased {
            transfer_id: self.transfer_id,
            nodes: std::mem::take(&mut self.nodes),
        });
    }
}

impl std::fmt::Debug for Reservation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reservation")
            .field("transfer_id", &self.transfer_id)
            .field("nodes", &self.nodes)
            .field("released", &self.released)
            .finish()
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.release_once();
    }
}
