//! Order reconciliation with venues.
//!
//! Diffs the local open set against each venue's remote open orders:
//! imports orphans, closes locals that vanished remotely.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::import::import_remote;
use crate::logging::KeyedLogThrottle;
use crate::metrics;
use crate::orders::{OrderRecord, OrderStore, UpsertOutcome};
use crate::supervisor::{run_periodic, ShutdownSignal};
use crate::types::{base_of, OrderSide, OrderStatus};
use crate::venue::{Capability, RemoteOrder, VenueError, VenueRegistry};

/// What happens to a locally-open order that no venue lists any more.
///
/// The venue cannot tell us whether it filled or was canceled externally,
/// so this is a policy choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingOrderPolicy {
    /// Close as `FILLED`
    #[default]
    AssumeFilled,
    /// Close as `CANCELED`
    AssumeCanceled,
    /// Log and keep the order open
    LeaveOpen,
}

impl MissingOrderPolicy {
    fn terminal_status(self) -> Option<OrderStatus> {
        match self {
            Self::AssumeFilled => Some(OrderStatus::Filled),
            Self::AssumeCanceled => Some(OrderStatus::Canceled),
            Self::LeaveOpen => None,
        }
    }
}

/// Configuration for the reconciliation daemon.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Interval between passes
    pub interval: Duration,
    pub missing_order_policy: MissingOrderPolicy,
    /// Minimum spacing between repeated failure logs for one venue
    pub failure_log_interval: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            missing_order_policy: MissingOrderPolicy::AssumeFilled,
            failure_log_interval: Duration::from_secs(60),
        }
    }
}

/// Delta produced by one `reconcile_once` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Remote orders imported as new local records
    pub imported: usize,
    /// Local orders closed because no venue listed them
    pub closed: usize,
    /// Venues whose listing was fetched and diffed
    pub venues_checked: usize,
    /// Venues without the list-open-orders capability
    pub venues_skipped: usize,
    /// Venues whose fetch failed this pass
    pub venues_failed: Vec<String>,
    /// Remote rows that could not be imported
    pub malformed: usize,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.imported == 0 && self.closed == 0
    }
}

#[derive(Debug, Default)]
struct VenueDelta {
    imported: usize,
    closed: usize,
    malformed: usize,
}

/// Periodic reconciler between the `OrderStore` and every registered venue.
///
/// # Matching
///
/// A local order matches a remote one by `venue_order_id`. Local orders
/// that do not carry a venue id yet fall back to a `(symbol, side)` match
/// against any listed remote order. That heuristic ignores price and
/// quantity, so several same-side locals on one symbol all match a single
/// remote order and stay open; the ambiguity is left for the operator.
pub struct ReconciliationDaemon {
    store: Arc<OrderStore>,
    registry: Arc<VenueRegistry>,
    config: ReconcileConfig,
    failure_logs: Mutex<KeyedLogThrottle>,
}

impl ReconciliationDaemon {
    pub fn new(store: Arc<OrderStore>, registry: Arc<VenueRegistry>, config: ReconcileConfig) -> Self {
        let failure_logs = Mutex::new(KeyedLogThrottle::new(config.failure_log_interval));
        Self {
            store,
            registry,
            config,
            failure_logs,
        }
    }

    pub fn with_defaults(store: Arc<OrderStore>, registry: Arc<VenueRegistry>) -> Self {
        Self::new(store, registry, ReconcileConfig::default())
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Run one full pass over all venues.
    ///
    /// A venue whose fetch fails is skipped; the pass always completes.
    #[instrument(skip(self), name = "reconcile_once")]
    pub async fn reconcile_once(&self) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for venue in self.registry.names() {
            let client = match self.registry.client_with(&venue, Capability::ListOpenOrders) {
                Ok(client) => client,
                Err(e) => {
                    debug!(venue = %venue, reason = %e, "Venue skipped for reconciliation");
                    report.venues_skipped += 1;
                    continue;
                }
            };

            let remote = match client.list_open_orders().await {
                Ok(remote) => remote,
                Err(VenueError::Unsupported(_)) => {
                    debug!(venue = %venue, "Venue declared listing but does not implement it");
                    report.venues_skipped += 1;
                    continue;
                }
                Err(e) => {
                    self.log_venue_failure(&venue, &e);
                    metrics::record_venue_failure(&venue);
                    report.venues_failed.push(venue);
                    continue;
                }
            };

            // Local view is taken after the fetch so orders placed while the
            // request was in flight are not imported as duplicates.
            let delta = self.reconcile_venue(&venue, remote);
            report.venues_checked += 1;
            report.imported += delta.imported;
            report.closed += delta.closed;
            report.malformed += delta.malformed;
        }

        metrics::record_reconcile_run(report.imported, report.closed);
        if !report.is_noop() || !report.venues_failed.is_empty() {
            info!(
                imported = report.imported,
                closed = report.closed,
                venues_checked = report.venues_checked,
                venues_failed = report.venues_failed.len(),
                "Reconciliation pass completed"
            );
        } else {
            debug!(venues_checked = report.venues_checked, "Reconciliation pass: in sync");
        }

        report
    }

    /// Diff one venue. Synchronous: no suspension between reads and writes.
    fn reconcile_venue(&self, venue: &str, remote: Vec<RemoteOrder>) -> VenueDelta {
        let mut delta = VenueDelta::default();

        let mut remote_by_id: BTreeMap<String, RemoteOrder> = BTreeMap::new();
        for order in remote {
            // Rows without a symbol still match by id; import rejects them later.
            match order.order_id.clone() {
                Some(id) => {
                    remote_by_id.insert(id, order);
                }
                None => {
                    warn!(venue = %venue, remote = ?order, "Malformed remote order skipped (missing id)");
                    delta.malformed += 1;
                }
            }
        }

        let on_venue = |o: &OrderRecord| {
            o.venue()
                .map(|v| v.eq_ignore_ascii_case(venue))
                .unwrap_or(false)
        };
        let all_local: Vec<OrderRecord> = self.store.list_all().into_iter().filter(|o| on_venue(o)).collect();
        let known_venue_ids: HashSet<&str> = all_local
            .iter()
            .filter_map(|o| o.venue_order_id.as_deref())
            .collect();
        let local_open: Vec<&OrderRecord> = all_local.iter().filter(|o| o.is_open()).collect();

        let mut claimed: HashSet<String> = HashSet::new();
        let mut unmatched: Vec<&OrderRecord> = Vec::new();
        let mut needs_heuristic: Vec<&OrderRecord> = Vec::new();

        for local in local_open.iter().copied() {
            match local.venue_order_id.as_deref() {
                Some(vid) if remote_by_id.contains_key(vid) => {
                    claimed.insert(vid.to_string());
                }
                Some(_) => unmatched.push(local),
                None => needs_heuristic.push(local),
            }
        }

        for local in needs_heuristic {
            let candidate = remote_by_id
                .iter()
                .find(|(_, r)| heuristic_match(local, r))
                .map(|(id, _)| id.clone());

            match candidate {
                Some(id) => {
                    debug!(
                        order_id = %local.id,
                        venue_order_id = %id,
                        "Matched local order by (symbol, side) heuristic"
                    );
                    claimed.insert(id);
                }
                None => unmatched.push(local),
            }
        }

        for local in unmatched {
            match self.config.missing_order_policy.terminal_status() {
                Some(status) => {
                    if self.store.close(&local.id, status) {
                        info!(
                            order_id = %local.id,
                            symbol = %local.symbol,
                            status = %status,
                            "Local order missing remotely, closed"
                        );
                        delta.closed += 1;
                    }
                }
                None => {
                    warn!(
                        order_id = %local.id,
                        symbol = %local.symbol,
                        "Local order missing remotely, left open by policy"
                    );
                }
            }
        }

        for (id, remote) in &remote_by_id {
            if claimed.contains(id) {
                continue;
            }
            if known_venue_ids.contains(id.as_str()) {
                debug!(venue = %venue, venue_order_id = %id, "Remote order already known locally as closed, not re-imported");
                continue;
            }
            match import_remote(remote, venue) {
                Ok(record) => {
                    let order_id = record.id.clone();
                    let symbol = record.symbol.clone();
                    if self.store.upsert(record, "reconcile") == UpsertOutcome::Inserted {
                        info!(
                            order_id = %order_id,
                            venue_order_id = %id,
                            symbol = %symbol,
                            "Imported remote order"
                        );
                        delta.imported += 1;
                    }
                }
                Err(e) => {
                    warn!(venue = %venue, venue_order_id = %id, error = %e, "Remote order import skipped");
                    delta.malformed += 1;
                }
            }
        }

        delta
    }

    fn log_venue_failure(&self, venue: &str, error: &VenueError) {
        let emit = match self.failure_logs.lock() {
            Ok(mut throttle) => throttle.check(venue),
            Err(_) => Some(0),
        };
        if let Some(suppressed) = emit {
            warn!(
                venue = %venue,
                error = %error,
                suppressed = suppressed,
                "Failed to fetch remote open orders, venue skipped this pass"
            );
        }
    }

    /// Run passes on the configured interval until shutdown.
    pub async fn run(self: Arc<Self>, shutdown: ShutdownSignal) {
        let interval = self.config.interval;
        run_periodic("reconciliation", interval, shutdown, move || {
            let daemon = self.clone();
            async move {
                daemon.reconcile_once().await;
            }
        })
        .await;
    }

    /// Spawn the periodic loop.
    pub fn spawn(self: Arc<Self>, shutdown: ShutdownSignal) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

fn heuristic_match(local: &OrderRecord, remote: &RemoteOrder) -> bool {
    let same_symbol = remote
        .symbol
        .as_deref()
        .map(|s| base_of(s).eq_ignore_ascii_case(base_of(&local.symbol)))
        .unwrap_or(false);
    let same_side = remote
        .side
        .as_deref()
        .and_then(OrderSide::parse_vendor)
        .map(|s| s == local.side)
        .unwrap_or(false);
    same_symbol && same_side
}
