//! Core types for order management.
//!
//! Provides type-safe order identifiers and the `OrderRecord` ledger row.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{OrderSide, OrderStatus, OrderType, TimeInForce};

/// Type-safe local order identifier.
///
/// Uses a newtype wrapper to prevent accidentally mixing local ids
/// with venue order ids or other string types at compile time.
///
/// # Example
///
/// ```
/// use execution_core::orders::OrderId;
///
/// let id = OrderId::new("abc-123-def");
/// assert_eq!(id.as_str(), "abc-123-def");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(String);

impl OrderId {
    /// Create a new OrderId from any string-like type.
    ///
    /// # Panics
    ///
    /// Debug builds will panic if the ID is empty. Release builds log a warning.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let s: String = id.into();
        debug_assert!(!s.is_empty(), "OrderId cannot be empty");
        if s.is_empty() {
            tracing::warn!("Creating OrderId with empty string - this may cause tracking issues");
        }
        Self(s)
    }

    /// Generate a fresh random local id.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for OrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One row per order the bot is aware of.
///
/// Records are never physically deleted; closed orders stay queryable
/// but drop out of the open set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Local identity
    pub id: OrderId,
    /// Idempotency / source tag ("imported" for reconciliation imports)
    pub client_key: String,
    /// Composite `BASE.VENUE` symbol
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub time_in_force: TimeInForce,
    pub status: OrderStatus,
    /// Vendor-assigned order id, once known
    pub venue_order_id: Option<String>,
    pub filled_qty: Decimal,
    pub avg_fill_price: Option<Decimal>,
    pub error: Option<String>,
    pub strategy_id: Option<String>,
    /// Shared id linking the two legs of a one-cancels-other pair
    pub oco_group_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRecord {
    /// Create a new record in `New` status with nothing filled.
    #[must_use]
    pub fn new(
        id: OrderId,
        client_key: impl Into<String>,
        symbol: impl Into<String>,
        side: OrderSide,
        order_type: OrderType,
        quantity: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            client_key: client_key.into(),
            symbol: symbol.into(),
            side,
            order_type,
            quantity,
            price: None,
            stop_price: None,
            time_in_force: TimeInForce::default(),
            status: OrderStatus::New,
            venue_order_id: None,
            filled_qty: Decimal::ZERO,
            avg_fill_price: None,
            error: None,
            strategy_id: None,
            oco_group_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    #[must_use]
    pub fn with_stop_price(mut self, stop_price: Decimal) -> Self {
        self.stop_price = Some(stop_price);
        self
    }

    #[must_use]
    pub fn with_venue_order_id(mut self, venue_order_id: impl Into<String>) -> Self {
        self.venue_order_id = Some(venue_order_id.into());
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }

    /// Venue part of the composite symbol.
    pub fn venue(&self) -> Option<&str> {
        crate::types::venue_of(&self.symbol)
    }

    /// Check if order is still in the open set.
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// Remaining unfilled quantity.
    pub fn unfilled_qty(&self) -> Decimal {
        (self.quantity - self.filled_qty).max(Decimal::ZERO)
    }
}
