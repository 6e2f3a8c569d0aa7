//! `OrderPlacer` backed by paper venues.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::info;

use super::venue::PaperVenue;
use crate::orders::{OrderId, OrderRecord, OrderStore};
use crate::types::{base_of, venue_of};
use crate::venue::{OrderPlacer, OrderRequest, PlacedOrder, PlacementError, RemoteOrder, VenueError};

/// Records every placement in the store as `NEW` and lists it on the paper
/// venue named by the symbol suffix.
pub struct PaperPlacer {
    store: Arc<OrderStore>,
    venues: HashMap<String, Arc<PaperVenue>>,
}

impl PaperPlacer {
    pub fn new(store: Arc<OrderStore>) -> Self {
        Self {
            store,
            venues: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_venue(mut self, venue: Arc<PaperVenue>) -> Self {
        self.venues.insert(venue.name().to_string(), venue);
        self
    }
}

#[async_trait]
impl OrderPlacer for PaperPlacer {
    async fn place_order(&self, request: OrderRequest) -> Result<PlacedOrder, PlacementError> {
        if request.quantity <= Decimal::ZERO {
            return Err(PlacementError::Rejected(format!(
                "quantity must be positive, got {}",
                request.quantity
            )));
        }
        let venue_name = venue_of(&request.symbol)
            .map(str::to_ascii_uppercase)
            .ok_or_else(|| PlacementError::Rejected(format!("symbol {} has no venue suffix", request.symbol)))?;
        let venue = self
            .venues
            .get(&venue_name)
            .ok_or_else(|| PlacementError::Venue(VenueError::UnknownVenue(venue_name.clone())))?;
        if venue.is_failing() {
            return Err(PlacementError::Venue(VenueError::Network(format!(
                "{} unreachable (simulated)",
                venue_name
            ))));
        }

        let venue_order_id = venue.next_venue_order_id();
        let mut remote = RemoteOrder::new(venue_order_id.clone(), base_of(&request.symbol))
            .with_side(&request.side.to_string())
            .with_status("NEW")
            .with_type(&request.order_type.to_string())
            .with_quantities(request.quantity, Decimal::ZERO);
        remote.price = request.price;
        remote.stop_price = request.stop_price;
        remote.time_in_force = Some(request.time_in_force.to_string());
        venue.add_order(remote);

        let id = OrderId::generate();
        let mut record = OrderRecord::new(
            id.clone(),
            request.client_key,
            request.symbol,
            request.side,
            request.order_type,
            request.quantity,
        )
        .with_venue_order_id(venue_order_id.clone());
        record.price = request.price;
        record.stop_price = request.stop_price;
        record.time_in_force = request.time_in_force;
        record.strategy_id = request.strategy_id;

        info!(
            order_id = %id,
            venue_order_id = %venue_order_id,
            symbol = %record.symbol,
            side = %record.side,
            order_type = %record.order_type,
            quantity = %record.quantity,
            "Paper order placed"
        );
        self.store.upsert(record, "placement");

        Ok(PlacedOrder {
            order_id_local: id,
            venue_order_id: Some(venue_order_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderSide, OrderStatus};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_place_writes_store_and_venue() {
        let store = Arc::new(OrderStore::new());
        let venue = Arc::new(PaperVenue::new("PAPER"));
        let placer = PaperPlacer::new(store.clone()).with_venue(venue.clone());

        let placed = placer
            .place_order(OrderRequest::limit("k1", "BTCUSDT.PAPER", OrderSide::Buy, dec!(2), dec!(100)))
            .await
            .unwrap();

        let record = store.get(&placed.order_id_local).unwrap();
        assert_eq!(record.status, OrderStatus::New);
        assert_eq!(record.client_key, "k1");
        assert_eq!(record.venue_order_id, placed.venue_order_id);

        let listed = venue.open_orders();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].symbol.as_deref(), Some("BTCUSDT"));
        assert_eq!(listed[0].orig_qty, Some(dec!(2)));
    }

    #[tokio::test]
    async fn test_rejections() {
        let store = Arc::new(OrderStore::new());
        let venue = Arc::new(PaperVenue::new("PAPER"));
        let placer = PaperPlacer::new(store.clone()).with_venue(venue.clone());

        let unknown = placer
            .place_order(OrderRequest::limit("k", "BTCUSDT.OTHER", OrderSide::Buy, dec!(1), dec!(1)))
            .await;
        assert!(matches!(unknown, Err(PlacementError::Venue(VenueError::UnknownVenue(_)))));

        let zero = placer
            .place_order(OrderRequest::limit("k", "BTCUSDT.PAPER", OrderSide::Buy, dec!(0), dec!(1)))
            .await;
        assert!(matches!(zero, Err(PlacementError::Rejected(_))));

        venue.set_failing(true);
        let down = placer
            .place_order(OrderRequest::limit("k", "BTCUSDT.PAPER", OrderSide::Buy, dec!(1), dec!(1)))
            .await;
        assert!(matches!(down, Err(PlacementError::Venue(VenueError::Network(_)))));
        assert!(store.is_empty());
    }
}
