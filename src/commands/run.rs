//! Run command handler.
//!
//! Runs every daemon on paper venues with a random-walk price feed until
//! Ctrl-C, then shuts down cleanly.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::paper_core;
use crate::config::CoreConfig;
use crate::signals::{EventBus, TracingEventBus};

/// Run the core until Ctrl-C.
///
/// # Arguments
/// * `config` - Loaded core configuration
/// * `seed_prices` - Initial paper prices, set on every paper venue
/// * `walk_step` - Maximum per-second fractional price move
///
/// # Errors
/// Returns error if the Ctrl-C handler cannot be installed.
pub async fn run_core(
    config: CoreConfig,
    seed_prices: &[(String, Decimal)],
    walk_step: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("--- Execution core: paper mode ---");
    let (core, venues) = paper_core(config);

    for venue in &venues {
        for (symbol, price) in seed_prices {
            venue.set_price(symbol, *price);
        }
    }
    if seed_prices.is_empty() {
        warn!("No --seed-price given; trailing stops will have no price source");
    }

    let bus: Arc<dyn EventBus> = Arc::new(TracingEventBus);
    core.start(Some(bus));

    let walker = {
        let venues = venues.clone();
        tokio::spawn(async move {
            let mut rng = StdRng::from_entropy();
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            loop {
                ticker.tick().await;
                for venue in &venues {
                    venue.random_walk(&mut rng, walk_step);
                }
            }
        })
    };

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received");

    walker.abort();
    core.shutdown().await;
    Ok(())
}
