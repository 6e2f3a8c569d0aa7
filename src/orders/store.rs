//! Authoritative in-process order ledger.
//!
//! Every other component reads and writes order state through `OrderStore`.
//! All methods are synchronous: a mutation completes without ever reaching
//! an `.await`, so concurrent daemons only observe whole records.

use std::collections::HashMap;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use super::types::{OrderId, OrderRecord};
use crate::types::OrderStatus;

/// Outcome of an `upsert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
    /// Existing record is terminal and the incoming one would change its status.
    RejectedTerminal,
}

/// In-memory order ledger keyed by local id.
///
/// # Thread Safety
///
/// Backed by `DashMap`; no guard is ever held across an await point.
/// Share it as `Arc<OrderStore>` from the composition root.
#[derive(Debug, Default)]
pub struct OrderStore {
    orders: DashMap<OrderId, OrderRecord>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or fully replace a record by id. No field merging.
    ///
    /// `source` tags the writer in logs (e.g. "placement", "reconcile").
    /// A terminal record never transitions to a different status.
    pub fn upsert(&self, mut record: OrderRecord, source: &str) -> UpsertOutcome {
        record.updated_at = Utc::now();
        let id = record.id.clone();

        match self.orders.entry(id.clone()) {
            Entry::Occupied(mut existing) => {
                let current = existing.get().status;
                if current.is_terminal() && current != record.status {
                    warn!(
                        order_id = %id,
                        source = source,
                        current = %current,
                        attempted = %record.status,
                        "Refusing to move terminal order to a new status"
                    );
                    return UpsertOutcome::RejectedTerminal;
                }
                debug!(order_id = %id, source = source, status = %record.status, "Order replaced");
                existing.insert(record);
                UpsertOutcome::Replaced
            }
            Entry::Vacant(slot) => {
                debug!(order_id = %id, source = source, status = %record.status, "Order inserted");
                slot.insert(record);
                UpsertOutcome::Inserted
            }
        }
    }

    /// All records in the open set. Order unspecified.
    pub fn list_open(&self) -> Vec<OrderRecord> {
        self.orders
            .iter()
            .filter(|entry| entry.value().is_open())
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Every record, open or closed.
    pub fn list_all(&self) -> Vec<OrderRecord> {
        self.orders.iter().map(|e| e.value().clone()).collect()
    }

    /// Move an open order to a terminal status.
    ///
    /// Returns true if the record changed. Unknown ids, already-terminal
    /// records and non-terminal target statuses are no-ops.
    pub fn close(&self, id: &OrderId, status: OrderStatus) -> bool {
        if status.is_open() {
            warn!(order_id = %id, status = %status, "close() called with a non-terminal status");
            return false;
        }

        match self.orders.get_mut(id) {
            Some(mut order) if order.is_open() => {
                let old = order.status;
                order.status = status;
                order.updated_at = Utc::now();
                info!(
                    order_id = %id,
                    symbol = %order.symbol,
                    old_status = %old,
                    new_status = %status,
                    "Order closed"
                );
                true
            }
            Some(_) => false,
            None => {
                debug!(order_id = %id, "close() on unknown order");
                false
            }
        }
    }

    /// Tag a record with an OCO group id. Returns false for unknown ids.
    pub fn set_oco_group(&self, id: &OrderId, group_id: &str) -> bool {
        match self.orders.get_mut(id) {
            Some(mut order) => {
                order.oco_group_id = Some(group_id.to_string());
                order.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &OrderId) -> Option<OrderRecord> {
        self.orders.get(id).map(|o| o.value().clone())
    }

    /// Records grouped by `oco_group_id`, regardless of status.
    pub fn oco_groups(&self) -> HashMap<String, Vec<OrderRecord>> {
        let mut groups: HashMap<String, Vec<OrderRecord>> = HashMap::new();
        for entry in self.orders.iter() {
            if let Some(group) = &entry.value().oco_group_id {
                groups
                    .entry(group.clone())
                    .or_default()
                    .push(entry.value().clone());
            }
        }
        groups
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn open_count(&self) -> usize {
        self.orders.iter().filter(|e| e.value().is_open()).count()
    }
}
