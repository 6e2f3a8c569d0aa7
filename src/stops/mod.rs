//! Trailing protective stops.
//!
//! - `TrailingStop` - Per-trail ratchet state machine
//! - `TrailingStopManager` - Active set plus the periodic tick that fires
//!   protective stop orders through the `OrderPlacer`

mod manager;
mod trail;

pub use manager::{TickReport, TrailingConfig, TrailingStopManager, TRAIL_CLIENT_KEY_PREFIX};
pub use trail::{TrailConfigError, TrailDistance, TrailStep, TrailingStop};
