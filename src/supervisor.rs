//! Daemon supervision.
//!
//! Every background loop (reconciliation, OCO, trailing stops) runs through
//! `run_periodic`: one pass per tick, panics inside a pass are caught and
//! logged, and the loop exits only when the shutdown signal flips.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// Shutdown signal shared by all daemons. `true` means stop.
pub type ShutdownSignal = watch::Receiver<bool>;

/// Run `pass` every `interval` until `shutdown` is signalled.
///
/// The first pass runs immediately. A pass in progress is never interrupted
/// by shutdown; the loop checks the signal between passes. Each pass runs in
/// its own task so a panic surfaces as a `JoinError` instead of killing the loop.
pub async fn run_periodic<F, Fut>(
    name: &'static str,
    interval: Duration,
    mut shutdown: ShutdownSignal,
    mut pass: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    if *shutdown.borrow() {
        info!(daemon = name, "Shutdown already signalled, daemon not started");
        return;
    }

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(daemon = name, interval_ms = interval.as_millis() as u64, "Daemon started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match tokio::spawn(pass()).await {
                    Ok(()) => {}
                    Err(e) if e.is_panic() => {
                        let panic_info = e.into_panic();
                        error!(
                            daemon = name,
                            panic_msg = %panic_message(panic_info.as_ref()),
                            "CRITICAL: Daemon pass panicked, continuing with next tick"
                        );
                    }
                    Err(e) => warn!(daemon = name, error = %e, "Daemon pass cancelled"),
                }
            }
            changed = shutdown.changed() => {
                // A dropped sender also means shutdown.
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!(daemon = name, "Daemon stopped");
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
