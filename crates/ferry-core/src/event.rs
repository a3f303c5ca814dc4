use serde::Serialize;

use crate::error::ErrorKind;
use crate::types::{NodeSet, TransferId};

/// Lifecycle events of a single transfer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransferEvent {
    Started {
        transfer_id: TransferId,
        source: String,
        target: String,
    },
    NodesReserved {
        transfer_id: TransferId,
        nodes: NodeSet,
    },
    Rejected {
        transfer_id: TransferId,
        busy: Vec<String>,
    },
    NodesReleased {
        transfer_id: TransferId,
        nodes: NodeSet,
    },
    Finished {
        transfer_id: TransferId,
        outcome: Option<ErrorKind>,
    },
}

impl TransferEvent {
    pub fn transfer_id(&self) -> TransferId {
        match self {
            TransferEvent::Started { transfer_id, .. }
            | TransferEvent::NodesReserved { transfer_id, .. }
            | TransferEvent::Rejected { transfer_id, .. }
            | TransferEvent::NodesReleased { transfer_id, .. }
            | TransferEvent::Finished { transfer_id, .. } => *transfer_id,
        }
    }
}

/// Event bus using tokio broadcast channel.
/// All subscribers receive all events.
pub struct EventBus {
    tx: tokio::sync::broadcast::Sender<TransferEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = tokio::sync::broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: TransferEvent) {
        // Ignore error if no receivers
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<TransferEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
