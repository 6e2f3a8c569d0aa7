//! Registry and tick loop for trailing stops.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use super::trail::{ensure_positive, TrailConfigError, TrailDistance, TrailStep, TrailingStop};
use crate::logging::KeyedLogThrottle;
use crate::metrics;
use crate::orders::OrderId;
use crate::supervisor::{run_periodic, ShutdownSignal};
use crate::types::{base_of, venue_of, OrderSide};
use crate::venue::{Capability, OrderPlacer, OrderRequest, VenueError, VenueRegistry};

/// `client_key` prefix on protective orders fired by a trail.
pub const TRAIL_CLIENT_KEY_PREFIX: &str = "trail";

#[derive(Debug, Clone)]
pub struct TrailingConfig {
    pub interval: Duration,
    /// Minimum spacing between repeated price-failure warnings per symbol
    pub failure_log_interval: Duration,
}

impl Default for TrailingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            failure_log_interval: Duration::from_secs(60),
        }
    }
}

/// Counts from one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub observed: usize,
    /// No price available this tick
    pub skipped: usize,
    pub ratcheted: usize,
    pub triggered: usize,
    pub placement_failures: usize,
}

/// Owns the active trail set and fires protective orders on breach.
pub struct TrailingStopManager {
    trails: DashMap<String, TrailingStop>,
    registry: Arc<VenueRegistry>,
    placer: Arc<dyn OrderPlacer>,
    config: TrailingConfig,
    seq: AtomicU64,
    failure_logs: Mutex<KeyedLogThrottle>,
}

impl TrailingStopManager {
    pub fn new(
        registry: Arc<VenueRegistry>,
        placer: Arc<dyn OrderPlacer>,
        config: TrailingConfig,
    ) -> Self {
        let failure_logs = Mutex::new(KeyedLogThrottle::new(config.failure_log_interval));
        Self {
            trails: DashMap::new(),
            registry,
            placer,
            config,
            seq: AtomicU64::new(0),
            failure_logs,
        }
    }

    /// Register a new trail. Exactly one of `trail_pct` (fraction, 0.01 = 1%)
    /// or `trail_usd` must be given.
    pub fn add_trailing_stop(
        &self,
        symbol: &str,
        side: OrderSide,
        trail_pct: Option<Decimal>,
        trail_usd: Option<Decimal>,
        quantity: Decimal,
        linked_order_id: Option<OrderId>,
    ) -> Result<String, TrailConfigError> {
        let distance = TrailDistance::from_params(trail_pct, trail_usd)?;
        ensure_positive("quantity", quantity)?;

        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let trail_id = format!(
            "{}:{}:{}:{}:{}",
            symbol,
            side,
            chrono::Utc::now().timestamp_millis(),
            distance.label(),
            seq
        );

        let trail = TrailingStop::new(trail_id.clone(), symbol, side, distance, quantity, linked_order_id);
        info!(
            trail_id = %trail_id,
            symbol = %symbol,
            side = %side,
            distance = %distance.label(),
            quantity = %quantity,
            "Trailing stop armed"
        );
        self.trails.insert(trail_id.clone(), trail);
        Ok(trail_id)
    }

    /// Drop a trail without firing. Returns the removed trail, if any.
    pub fn remove_trailing_stop(&self, trail_id: &str) -> Option<TrailingStop> {
        let removed = self.trails.remove(trail_id).map(|(_, trail)| trail);
        if removed.is_some() {
            info!(trail_id = %trail_id, "Trailing stop removed");
        }
        removed
    }

    /// Snapshot of active trails, oldest first.
    pub fn list_active_trails(&self) -> Vec<TrailingStop> {
        let mut trails: Vec<TrailingStop> = self.trails.iter().map(|e| e.value().clone()).collect();
        trails.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.trail_id.cmp(&b.trail_id))
        });
        trails
    }

    pub fn get(&self, trail_id: &str) -> Option<TrailingStop> {
        self.trails.get(trail_id).map(|t| t.value().clone())
    }

    pub fn len(&self) -> usize {
        self.trails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trails.is_empty()
    }

    /// Evaluate every active trail once, sequentially.
    pub async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();
        let mut ids: Vec<String> = self.trails.iter().map(|e| e.key().clone()).collect();
        ids.sort();

        for trail_id in ids {
            let Some(symbol) = self.trails.get(&trail_id).map(|t| t.symbol.clone()) else {
                continue;
            };

            let Some(price) = self.last_price(&symbol).await else {
                report.skipped += 1;
                continue;
            };

            // No await while the entry guard is held.
            let step = match self.trails.get_mut(&trail_id) {
                Some(mut trail) => trail.observe(price),
                None => continue,
            };
            report.observed += 1;

            match step {
                TrailStep::WarmUp => {
                    debug!(trail_id = %trail_id, ref_price = %price, "Trail warm-up");
                }
                TrailStep::Holding { .. } | TrailStep::Spent => {}
                TrailStep::Ratcheted { reference, stop } => {
                    report.ratcheted += 1;
                    debug!(trail_id = %trail_id, ref_price = %reference, stop = %stop, "Trail ratcheted");
                }
                TrailStep::Triggered { stop } => {
                    // Whoever removes the entry fires; this makes the trigger one-shot.
                    let Some((_, trail)) = self.trails.remove(&trail_id) else {
                        continue;
                    };
                    report.triggered += 1;
                    if !self.fire(&trail, price, stop).await {
                        report.placement_failures += 1;
                    }
                }
            }
        }

        report
    }

    async fn fire(&self, trail: &TrailingStop, price: Decimal, stop: Decimal) -> bool {
        metrics::record_trailing_trigger(&trail.symbol);
        let mut request = OrderRequest::stop_market(
            format!("{}:{}", TRAIL_CLIENT_KEY_PREFIX, trail.trail_id),
            trail.symbol.clone(),
            trail.exit_side(),
            trail.quantity,
            stop,
        );
        request.strategy_id = trail.linked_order_id.as_ref().map(|id| id.to_string());

        match self.placer.place_order(request).await {
            Ok(placed) => {
                info!(
                    trail_id = %trail.trail_id,
                    symbol = %trail.symbol,
                    price = %price,
                    stop = %stop,
                    order_id = %placed.order_id_local,
                    "Trailing stop triggered, protective order placed"
                );
                true
            }
            Err(e) => {
                error!(
                    trail_id = %trail.trail_id,
                    symbol = %trail.symbol,
                    price = %price,
                    stop = %stop,
                    error = %e,
                    "CRITICAL: Trailing stop triggered but protective order failed"
                );
                false
            }
        }
    }

    async fn last_price(&self, symbol: &str) -> Option<Decimal> {
        let venue = venue_of(symbol).unwrap_or_default();
        let client = match self.registry.client_with(venue, Capability::LastPrice) {
            Ok(client) => client,
            Err(e) => {
                debug!(symbol = %symbol, reason = %e, "No price source for trail");
                return None;
            }
        };

        match client.get_last_price(base_of(symbol)).await {
            Ok(Some(price)) if price > Decimal::ZERO => Some(price),
            Ok(other) => {
                debug!(symbol = %symbol, price = ?other, "No usable price this tick");
                None
            }
            Err(e) => {
                self.log_price_failure(symbol, &e);
                None
            }
        }
    }

    fn log_price_failure(&self, symbol: &str, error: &VenueError) {
        let suppressed = match self.failure_logs.lock() {
            Ok(mut throttle) => throttle.check(symbol),
            Err(_) => Some(0),
        };
        if let Some(suppressed) = suppressed {
            warn!(symbol = %symbol, error = %error, suppressed = suppressed, "Price fetch failed");
        }
    }

    pub async fn run(self: Arc<Self>, shutdown: ShutdownSignal) {
        let interval = self.config.interval;
        run_periodic("trailing_stops", interval, shutdown, move || {
            let manager = self.clone();
            async move {
                let report = manager.tick().await;
                if report.triggered > 0 {
                    info!(?report, "Trailing tick completed");
                }
            }
        })
        .await;
    }

    pub fn spawn(self: Arc<Self>, shutdown: ShutdownSignal) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
