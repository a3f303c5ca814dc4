use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use ferry_core::types::{NodeReservation, NodeSet, TransferId};

#[derive(Debug, Default, Clone, Copy)]
struct Slot {
    holder: Option<TransferId>,
    reserved_at: Option<DateTime<Utc>>,
}

/// Why a test-and-set left the table untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Conflict {
    /// Nodes not present in the table at all.
    Unknown(Vec<String>),
    /// Nodes currently held by another transfer.
    Busy(Vec<String>),
}

/// Process-wide node -> busy table.
///
/// Every read and write goes through one `std::sync::Mutex`. The lock is
/// only ever held for a bounded pass over a node set, never across an
/// `.await`, which is also what lets a reservation release from `Drop`.
pub struct ReservationRegistry {
    table: Mutex<HashMap<String, Slot>>,
}

impl ReservationRegistry {
    /// Seed the table with every known node marked free.
    pub fn new<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let table = nodes
            .into_iter()
            .map(|n| (n.into(), Slot::default()))
            .collect();
        Self {
            table: Mutex::new(table),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        // Slots are plain values written in a non-panicking loop, so a
        // poisoned table is still consistent.
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn contains(&self, node: &str) -> bool {
        self.lock().contains_key(node)
    }

    /// All known nodes, sorted.
    pub fn known_nodes(&self) -> Vec<String> {
        let mut nodes: Vec<String> = self.lock().keys().cloned().collect();
        nodes.sort();
        nodes
    }

    /// Nodes of `nodes` that the table does not know about.
    pub fn unknown_nodes(&self, nodes: &NodeSet) -> Vec<String> {
        let table = self.lock();
        nodes
            .iter()
            .filter(|n| !table.contains_key(n.as_str()))
            .cloned()
            .collect()
    }

    pub fn is_reserved(&self, node: &str) -> bool {
        self.lock()
            .get(node)
            .is_some_and(|slot| slot.holder.is_some())
    }

    pub fn holder(&self, node: &str) -> Option<TransferId> {
        self.lock().get(node).and_then(|slot| slot.holder)
    }

    pub fn reserved_count(&self) -> usize {
        self.lock().values().filter(|s| s.holder.is_some()).count()
    }

    /// Point-in-time copy of the whole table, sorted by node.
    pub fn snapshot(&self) -> Vec<NodeReservation> {
        let mut out: Vec<NodeReservation> = self
            .lock()
            .iter()
            .map(|(node, slot)| NodeReservation {
                node: node.clone(),
                reserved: slot.holder.is_some(),
                holder: slot.holder,
                reserved_at: slot.reserved_at,
            })
            .collect();
        out.sort_by(|a, b| a.node.cmp(&b.node));
        out
    }

    /// Test every flag, then set every flag, in one critical section.
    ///
    /// On conflict nothing is written.
    pub(crate) fn test_and_set(
        &self,
        nodes: &NodeSet,
        holder: TransferId,
    ) -> Result<(), Conflict> {
        let mut table = self.lock();

        let unknown: Vec<String> = nodes
            .iter()
            .filter(|n| !table.contains_key(n.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(Conflict::Unknown(unknown));
        }

        let busy: Vec<String> = nodes
            .iter()
            .filter(|n| table.get(n.as_str()).is_some_and(|s| s.holder.is_some()))
            .cloned()
            .collect();
        if !busy.is_empty() {
            return Err(Conflict::Busy(busy));
        }

        let now = Utc::now();
        for node in nodes {
            if let Some(slot) = table.get_mut(node.as_str()) {
                slot.holder = Some(holder);
                slot.reserved_at = Some(now);
            }
        }
        Ok(())
    }

    /// Clear every flag in `nodes`, unconditionally.
    pub(crate) fn clear(&self, nodes: &NodeSet) {
        let mut table = self.lock();
        for node in nodes {
            if let Some(slot) = table.get_mut(node.as_str()) {
                *slot = Slot::default();
            }
        }
    }
}
