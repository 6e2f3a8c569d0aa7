//! Prometheus Metrics Module
//!
//! Pre-registered counters for the reconciliation, OCO, trailing-stop and
//! signal-queue paths. Registered in the default registry so an external
//! scraper (or `gather_metrics()`) sees them.

use lazy_static::lazy_static;
use prometheus::{
    opts, register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    // --- Reconciliation ---

    pub static ref RECONCILE_RUNS: IntCounter = register_int_counter!(
        opts!("reconcile_runs_total", "Reconciliation passes executed")
    ).expect("FATAL: Failed to register RECONCILE_RUNS metric - check for duplicate registration");

    pub static ref RECONCILE_IMPORTED: IntCounter = register_int_counter!(
        opts!("reconcile_imported_total", "Remote orders imported into the local store")
    ).expect("FATAL: Failed to register RECONCILE_IMPORTED metric - check for duplicate registration");

    pub static ref RECONCILE_CLOSED: IntCounter = register_int_counter!(
        opts!("reconcile_closed_total", "Local orders closed because they vanished remotely")
    ).expect("FATAL: Failed to register RECONCILE_CLOSED metric - check for duplicate registration");

    /// Per-venue fetch failures during reconciliation
    pub static ref RECONCILE_VENUE_FAILURES: IntCounterVec = register_int_counter_vec!(
        opts!("reconcile_venue_failures_total", "Venue fetch failures during reconciliation"),
        &["venue"]
    ).expect("FATAL: Failed to register RECONCILE_VENUE_FAILURES metric - check for duplicate registration");

    // --- OCO ---

    /// Sibling cancel attempts (outcome = success | failure | unsupported)
    pub static ref OCO_CANCELS: IntCounterVec = register_int_counter_vec!(
        opts!("oco_cancels_total", "OCO sibling cancellations"),
        &["outcome"]
    ).expect("FATAL: Failed to register OCO_CANCELS metric - check for duplicate registration");

    // --- Trailing stops ---

    pub static ref TRAILING_TRIGGERS: IntCounterVec = register_int_counter_vec!(
        opts!("trailing_triggers_total", "Trailing stops triggered"),
        &["symbol"]
    ).expect("FATAL: Failed to register TRAILING_TRIGGERS metric - check for duplicate registration");

    // --- Signal queue ---

    pub static ref SIGNALS_DISPATCHED: IntCounterVec = register_int_counter_vec!(
        opts!("signal_queue_dispatched_total", "Signals forwarded to the event bus"),
        &["topic"]
    ).expect("FATAL: Failed to register SIGNALS_DISPATCHED metric - check for duplicate registration");

    /// Signals dropped (reason = expired | publish_error | publish_panic)
    pub static ref SIGNALS_DROPPED: IntCounterVec = register_int_counter_vec!(
        opts!("signal_queue_dropped_total", "Signals dropped before or during dispatch"),
        &["reason"]
    ).expect("FATAL: Failed to register SIGNALS_DROPPED metric - check for duplicate registration");
}

/// Record one finished reconciliation pass.
pub fn record_reconcile_run(imported: usize, closed: usize) {
    RECONCILE_RUNS.inc();
    RECONCILE_IMPORTED.inc_by(imported as u64);
    RECONCILE_CLOSED.inc_by(closed as u64);
}

pub fn record_venue_failure(venue: &str) {
    RECONCILE_VENUE_FAILURES.with_label_values(&[venue]).inc();
}

pub fn record_oco_cancel(outcome: &str) {
    OCO_CANCELS.with_label_values(&[outcome]).inc();
}

pub fn record_trailing_trigger(symbol: &str) {
    TRAILING_TRIGGERS.with_label_values(&[symbol]).inc();
}

pub fn record_signal_dispatched(topic: &str) {
    SIGNALS_DISPATCHED.with_label_values(&[topic]).inc();
}

pub fn record_signal_dropped(reason: &str) {
    SIGNALS_DROPPED.with_label_values(&[reason]).inc();
}

/// Get metrics as text for the /metrics endpoint.
///
/// Encoding errors are logged and yield an empty body instead of panicking.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode Prometheus metrics: {}", e);
        return String::new();
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Prometheus metrics buffer is not valid UTF-8: {}", e);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconcile_counters_are_monotonic() {
        let before = RECONCILE_RUNS.get();
        let imported_before = RECONCILE_IMPORTED.get();
        record_reconcile_run(2, 0);
        assert!(RECONCILE_RUNS.get() > before);
        assert!(RECONCILE_IMPORTED.get() >= imported_before + 2);
    }

    #[test]
    fn test_gather_metrics() {
        record_reconcile_run(0, 0);
        let output = gather_metrics();
        assert!(
            output.contains("reconcile_runs_total"),
            "Expected metrics output to contain 'reconcile_runs_total', got: {}",
            &output[..output.len().min(200)]
        );
    }
}
