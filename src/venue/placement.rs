//! Order-placement primitive consumed by OCO pairs and trailing stops.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use super::client::VenueError;
use crate::orders::OrderId;
use crate::types::{OrderSide, OrderType, TimeInForce};

/// Parameters for a new order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub client_key: String,
    /// Composite `BASE.VENUE` symbol
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub time_in_force: TimeInForce,
    pub strategy_id: Option<String>,
}

impl OrderRequest {
    #[must_use]
    pub fn limit(
        client_key: impl Into<String>,
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            client_key: client_key.into(),
            symbol: symbol.into(),
            side,
            order_type: OrderType::Limit,
            quantity,
            price: Some(price),
            stop_price: None,
            time_in_force: TimeInForce::Gtc,
            strategy_id: None,
        }
    }

    #[must_use]
    pub fn stop_market(
        client_key: impl Into<String>,
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: Decimal,
        stop_price: Decimal,
    ) -> Self {
        Self {
            client_key: client_key.into(),
            symbol: symbol.into(),
            side,
            order_type: OrderType::StopMarket,
            quantity,
            price: None,
            stop_price: Some(stop_price),
            time_in_force: TimeInForce::Gtc,
            strategy_id: None,
        }
    }
}

/// Result of a successful placement.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    /// Local id of the record the execution layer wrote into the store
    pub order_id_local: OrderId,
    pub venue_order_id: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlacementError {
    #[error("Order rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Venue(#[from] VenueError),
}

/// External placement primitive.
///
/// Implementations own record creation: a successful call leaves an
/// `OrderRecord` with id `order_id_local` in the shared `OrderStore`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderPlacer: Send + Sync {
    async fn place_order(&self, request: OrderRequest) -> Result<PlacedOrder, PlacementError>;
}
