//! Reconcile-once command handler.

use tracing::info;

use super::paper_core;
use crate::config::CoreConfig;

/// Run one reconciliation pass on the configured paper venues and print
/// the report as JSON.
///
/// # Errors
/// Returns error if the report cannot be serialized.
pub async fn run_reconcile_once(config: CoreConfig) -> Result<(), Box<dyn std::error::Error>> {
    let (core, venues) = paper_core(config);
    info!(venues = venues.len(), "Running one reconciliation pass");

    let report = core.reconciler().reconcile_once().await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
