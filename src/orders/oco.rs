//! One-cancels-other pairs.
//!
//! - `create_oco_pair` - submit two legs and link them with a shared group id
//! - `OcoWatcher` - once one leg is `FILLED`, cancel the sibling on its venue
//!
//! Only two-leg groups are handled; groups of any other size are ignored.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use super::store::OrderStore;
use super::types::{OrderId, OrderRecord};
use crate::metrics;
use crate::supervisor::{run_periodic, ShutdownSignal};
use crate::types::{base_of, OrderStatus};
use crate::venue::{Capability, OrderPlacer, OrderRequest, PlacedOrder, PlacementError, VenueRegistry};

/// Which leg of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcoLeg {
    First,
    Second,
}

impl std::fmt::Display for OcoLeg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OcoLeg::First => write!(f, "first"),
            OcoLeg::Second => write!(f, "second"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OcoError {
    #[error("OCO {leg} leg placement failed: {source}")]
    LegFailed {
        leg: OcoLeg,
        #[source]
        source: PlacementError,
    },

    /// The placer reported success but wrote no record into the store
    #[error("Placed order {0} has no local record")]
    RecordMissing(OrderId),
}

/// A linked pair as created by `create_oco_pair`.
#[derive(Debug, Clone, PartialEq)]
pub struct OcoPair {
    pub group_id: String,
    pub first: PlacedOrder,
    pub second: PlacedOrder,
}

/// Submit both legs sequentially, then tag both records with a fresh group id.
///
/// Both legs are always submitted. If either placement fails the error is
/// returned and nothing is rolled back: a leg that did go through stays on
/// the venue as an unlinked order (reconciliation will keep tracking it).
#[instrument(skip(store, placer), fields(first = %first.symbol, second = %second.symbol))]
pub async fn create_oco_pair(
    store: &OrderStore,
    placer: &dyn OrderPlacer,
    first: OrderRequest,
    second: OrderRequest,
) -> Result<OcoPair, OcoError> {
    let first_result = placer.place_order(first).await;
    let second_result = placer.place_order(second).await;

    let first = match first_result {
        Ok(placed) => placed,
        Err(source) => {
            if let Ok(orphan) = &second_result {
                warn!(
                    orphan_order_id = %orphan.order_id_local,
                    "First OCO leg failed; second leg was placed and is left unlinked"
                );
            }
            return Err(OcoError::LegFailed {
                leg: OcoLeg::First,
                source,
            });
        }
    };
    let second = match second_result {
        Ok(placed) => placed,
        Err(source) => {
            warn!(
                orphan_order_id = %first.order_id_local,
                "Second OCO leg failed; first leg was placed and is left unlinked"
            );
            return Err(OcoError::LegFailed {
                leg: OcoLeg::Second,
                source,
            });
        }
    };

    // Both records must exist before either is tagged; no partial groups.
    for placed in [&first, &second] {
        if store.get(&placed.order_id_local).is_none() {
            error!(order_id = %placed.order_id_local, "Placer returned an id unknown to the store");
            return Err(OcoError::RecordMissing(placed.order_id_local.clone()));
        }
    }
    let group_id = uuid::Uuid::new_v4().to_string();
    for placed in [&first, &second] {
        store.set_oco_group(&placed.order_id_local, &group_id);
    }

    info!(
        group_id = %group_id,
        first = %first.order_id_local,
        second = %second.order_id_local,
        "OCO pair created"
    );

    Ok(OcoPair {
        group_id,
        first,
        second,
    })
}

/// Configuration for the OCO watcher.
#[derive(Debug, Clone)]
pub struct OcoConfig {
    pub interval: Duration,
}

impl Default for OcoConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
        }
    }
}

/// Counts from one watcher pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OcoPassReport {
    /// Pairs with a filled leg and an open sibling
    pub triggered: usize,
    /// Siblings canceled and closed
    pub resolved: usize,
    pub cancel_failures: usize,
    /// Sibling venue cannot cancel (or is unknown)
    pub unsupported: usize,
    /// Groups skipped because they do not have exactly two members
    pub ignored_groups: usize,
}

/// Enforces "fill one leg, cancel the other".
///
/// Idempotent across ticks: once both legs are terminal the group is skipped.
pub struct OcoWatcher {
    store: Arc<OrderStore>,
    registry: Arc<VenueRegistry>,
    config: OcoConfig,
}

impl OcoWatcher {
    pub fn new(store: Arc<OrderStore>, registry: Arc<VenueRegistry>, config: OcoConfig) -> Self {
        Self {
            store,
            registry,
            config,
        }
    }

    /// Run one pass over all OCO groups.
    pub async fn run_once(&self) -> OcoPassReport {
        let mut report = OcoPassReport::default();
        let mut groups: Vec<(String, Vec<OrderRecord>)> = self.store.oco_groups().into_iter().collect();
        groups.sort_by(|a, b| a.0.cmp(&b.0));

        for (group_id, members) in groups {
            if !members.iter().any(OrderRecord::is_open) {
                continue;
            }
            let [a, b] = match <[OrderRecord; 2]>::try_from(members) {
                Ok(pair) => pair,
                Err(members) => {
                    debug!(group_id = %group_id, size = members.len(), "OCO group ignored (only pairs are supported)");
                    report.ignored_groups += 1;
                    continue;
                }
            };

            let (filled, sibling) = match (a.status, b.status) {
                (OrderStatus::Filled, _) => (a, b),
                (_, OrderStatus::Filled) => (b, a),
                _ => continue,
            };
            if !sibling.is_open() {
                continue;
            }

            report.triggered += 1;
            self.resolve_pair(&group_id, &filled, &sibling, &mut report).await;
        }

        report
    }

    async fn resolve_pair(
        &self,
        group_id: &str,
        filled: &OrderRecord,
        sibling: &OrderRecord,
        report: &mut OcoPassReport,
    ) {
        let venue = sibling.venue().unwrap_or_default();
        let client = match self.registry.client_with(venue, Capability::Cancel) {
            Ok(client) => client,
            Err(e) => {
                info!(
                    group_id = %group_id,
                    sibling = %sibling.id,
                    venue = %venue,
                    reason = %e,
                    "OCO sibling venue cannot cancel; leaving legs for reconciliation"
                );
                metrics::record_oco_cancel("unsupported");
                report.unsupported += 1;
                return;
            }
        };

        let cancel_result = match sibling.venue_order_id.as_deref() {
            Some(venue_order_id) => client.cancel(venue_order_id, base_of(&sibling.symbol)).await,
            None => Err(crate::venue::VenueError::Api(
                "sibling has no venue order id".to_string(),
            )),
        };

        match cancel_result {
            Ok(()) => {
                self.store.close(&sibling.id, OrderStatus::Canceled);
                self.store.close(&filled.id, OrderStatus::Filled);
                metrics::record_oco_cancel("success");
                info!(
                    group_id = %group_id,
                    filled = %filled.id,
                    canceled = %sibling.id,
                    "OCO sibling canceled"
                );
                report.resolved += 1;
            }
            Err(e) => {
                self.store.close(&filled.id, OrderStatus::Filled);
                metrics::record_oco_cancel("failure");
                warn!(
                    group_id = %group_id,
                    sibling = %sibling.id,
                    error = %e,
                    "OCO sibling cancel failed; sibling left open until reconciliation"
                );
                report.cancel_failures += 1;
            }
        }
    }

    pub async fn run(self: Arc<Self>, shutdown: ShutdownSignal) {
        let interval = self.config.interval;
        run_periodic("oco_watcher", interval, shutdown, move || {
            let watcher = self.clone();
            async move {
                let report = watcher.run_once().await;
                if report.triggered > 0 {
                    debug!(?report, "OCO pass completed");
                }
            }
        })
        .await;
    }

    pub fn spawn(self: Arc<Self>, shutdown: ShutdownSignal) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
