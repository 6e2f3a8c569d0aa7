//! Paper trading venue and placer.
//!
//! Stand-ins for real venue clients so the daemons can run end to end.

mod placer;
mod venue;

pub use placer::PaperPlacer;
pub use venue::PaperVenue;
