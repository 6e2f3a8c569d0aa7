//! Logging Module
//!
//! - `LogThrottle` / `KeyedLogThrottle` - rate limiting for repeating failure logs
//! - `init_tracing` - subscriber setup for the binary

pub mod throttle;

pub use throttle::{KeyedLogThrottle, LogThrottle};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_level` (e.g. "info") applies.
/// Returns an error if a subscriber is already installed.
pub fn init_tracing(default_level: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()?;

    Ok(())
}
