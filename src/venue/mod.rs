//! Venue Abstraction Layer
//!
//! The core consumes venues through a narrow, capability-gated contract:
//!
//! - `VenueClient` - optional capabilities (list open orders, cancel, last price)
//! - `Capabilities` - descriptor declared once by each adapter at registration
//! - `VenueRegistry` - name -> client lookup with the stored descriptor
//! - `OrderPlacer` - the order-placement primitive used by OCO and trailing stops
//!
//! Concrete HTTP/WebSocket clients live outside this crate.

mod client;
mod placement;
mod registry;
mod remote;

pub use client::{Capabilities, Capability, VenueClient, VenueError};
pub use placement::{OrderPlacer, OrderRequest, PlacedOrder, PlacementError};
pub use registry::VenueRegistry;
pub use remote::RemoteOrder;

#[cfg(test)]
pub use placement::MockOrderPlacer;
