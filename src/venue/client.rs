//! Venue client contract and capability descriptor.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use super::remote::RemoteOrder;

/// Optional operations a venue adapter may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ListOpenOrders,
    Cancel,
    LastPrice,
}

impl Capability {
    fn bit(self) -> u8 {
        match self {
            Capability::ListOpenOrders => 0b001,
            Capability::Cancel => 0b010,
            Capability::LastPrice => 0b100,
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::ListOpenOrders => write!(f, "list_open_orders"),
            Capability::Cancel => write!(f, "cancel"),
            Capability::LastPrice => write!(f, "last_price"),
        }
    }
}

/// Bitmask of supported capabilities, declared once per adapter.
///
/// ```
/// use execution_core::venue::{Capabilities, Capability};
///
/// let caps = Capabilities::none().with(Capability::Cancel);
/// assert!(caps.contains(Capability::Cancel));
/// assert!(!caps.contains(Capability::LastPrice));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities(u8);

impl Capabilities {
    #[must_use]
    pub const fn none() -> Self {
        Self(0)
    }

    #[must_use]
    pub fn all() -> Self {
        Self::none()
            .with(Capability::ListOpenOrders)
            .with(Capability::Cancel)
            .with(Capability::LastPrice)
    }

    #[must_use]
    pub fn with(self, cap: Capability) -> Self {
        Self(self.0 | cap.bit())
    }

    pub fn contains(&self, cap: Capability) -> bool {
        self.0 & cap.bit() != 0
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter().fold(Self::none(), Self::with)
    }
}

/// Errors surfaced by venue calls.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VenueError {
    /// The adapter does not implement this capability
    #[error("Capability not supported: {0}")]
    Unsupported(Capability),

    #[error("Unknown venue: {0}")]
    UnknownVenue(String),

    #[error("Network error: {0}")]
    Network(String),

    /// Venue answered with an error payload
    #[error("Venue API error: {0}")]
    Api(String),
}

/// Uniform per-venue client.
///
/// Every operation is optional. Adapters override the ones they support and
/// advertise them through `capabilities()`; the defaults report `Unsupported`.
#[async_trait]
pub trait VenueClient: Send + Sync {
    /// Capability descriptor, read once at registration time.
    fn capabilities(&self) -> Capabilities;

    /// Remote open orders for this venue.
    async fn list_open_orders(&self) -> Result<Vec<RemoteOrder>, VenueError> {
        Err(VenueError::Unsupported(Capability::ListOpenOrders))
    }

    /// Cancel a venue order by its vendor id.
    async fn cancel(&self, venue_order_id: &str, symbol: &str) -> Result<(), VenueError> {
        let _ = (venue_order_id, symbol);
        Err(VenueError::Unsupported(Capability::Cancel))
    }

    /// Last traded price, `None` when the venue has no quote.
    async fn get_last_price(&self, symbol: &str) -> Result<Option<Decimal>, VenueError> {
        let _ = symbol;
        Err(VenueError::Unsupported(Capability::LastPrice))
    }
}
