//! Mapping of vendor open orders into local records.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::warn;

use crate::orders::{OrderId, OrderRecord};
use crate::types::{composite_symbol, OrderSide, OrderStatus, OrderType, TimeInForce};
use crate::venue::RemoteOrder;

/// `client_key` stamped on every imported record.
pub const IMPORTED_CLIENT_KEY: &str = "imported";

/// A remote order that cannot be imported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    #[error("Remote order missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Remote order field '{field}' has unrecognized value '{value}'")]
    InvalidField { field: &'static str, value: String },
}

/// Deterministic local id for an imported order.
pub fn imported_order_id(venue: &str, venue_order_id: &str) -> OrderId {
    OrderId::new(format!("imported:{}:{}", venue, venue_order_id))
}

/// Build a local record from a vendor payload.
///
/// Only `order_id` and `symbol` are required. Conservative defaults:
/// absent or unknown side -> `BUY`, unknown type -> `LIMIT`, unknown TIF ->
/// `GTC`, unknown or absent status -> `NEW` (the venue listed it as open),
/// absent quantity -> executed quantity or zero, absent prices -> `None`.
/// Negative quantities are rejected.
pub fn import_remote(remote: &RemoteOrder, venue: &str) -> Result<OrderRecord, ImportError> {
    let venue_order_id = remote
        .order_id
        .as_deref()
        .ok_or(ImportError::MissingField("order_id"))?;
    let symbol = remote
        .symbol
        .as_deref()
        .ok_or(ImportError::MissingField("symbol"))?;

    let filled_qty = non_negative("executedQty", remote.executed_qty)?.unwrap_or(Decimal::ZERO);
    let quantity = non_negative("origQty", remote.orig_qty)?.unwrap_or(filled_qty);

    let side = match remote.side.as_deref().map(|raw| (raw, OrderSide::parse_vendor(raw))) {
        Some((_, Some(side))) => side,
        Some((raw, None)) => {
            warn!(venue = %venue, venue_order_id = %venue_order_id, side = %raw, "Unrecognized remote side, defaulting to BUY");
            OrderSide::Buy
        }
        None => {
            warn!(venue = %venue, venue_order_id = %venue_order_id, "Remote order has no side, defaulting to BUY");
            OrderSide::Buy
        }
    };
    let status = remote
        .status
        .as_deref()
        .and_then(OrderStatus::parse_vendor)
        .unwrap_or(OrderStatus::New);

    let mut record = OrderRecord::new(
        imported_order_id(venue, venue_order_id),
        IMPORTED_CLIENT_KEY,
        composite_symbol(symbol, venue),
        side,
        OrderType::from_vendor(remote.order_type.as_deref()),
        quantity,
    );
    record.price = remote.price;
    record.stop_price = remote.stop_price;
    record.time_in_force = TimeInForce::from_vendor(remote.time_in_force.as_deref());
    record.status = status;
    record.venue_order_id = Some(venue_order_id.to_string());
    record.filled_qty = filled_qty;

    Ok(record)
}

fn non_negative(field: &'static str, value: Option<Decimal>) -> Result<Option<Decimal>, ImportError> {
    match value {
        Some(v) if v.is_sign_negative() && !v.is_zero() => Err(ImportError::InvalidField {
            field,
            value: v.to_string(),
        }),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_import_maps_quantities_and_status() {
        let remote = RemoteOrder::new("555", "BTCUSDT")
            .with_side("BUY")
            .with_status("NEW")
            .with_quantities(dec!(1.0), dec!(0.3))
            .with_price(dec!(100));

        let record = import_remote(&remote, "BINANCE").unwrap();
        assert_eq!(record.filled_qty, dec!(0.3));
        assert_eq!(record.quantity, dec!(1.0));
        assert_eq!(record.status, OrderStatus::New);
        assert_eq!(record.symbol, "BTCUSDT.BINANCE");
        assert_eq!(record.client_key, IMPORTED_CLIENT_KEY);
        assert_eq!(record.venue_order_id.as_deref(), Some("555"));
        assert_eq!(record.price, Some(dec!(100)));
        assert_eq!(record.stop_price, None);
        assert_eq!(record.id, imported_order_id("BINANCE", "555"));
    }

    #[test]
    fn test_unknown_type_defaults_to_limit() {
        let remote = RemoteOrder::new("1", "ETHUSDT")
            .with_side("sell")
            .with_type("ICEBERG_SPECIAL");
        let record = import_remote(&remote, "BINANCE").unwrap();
        assert_eq!(record.order_type, OrderType::Limit);
        assert_eq!(record.time_in_force, TimeInForce::Gtc);
        assert_eq!(record.status, OrderStatus::New);
        assert_eq!(record.quantity, Decimal::ZERO);
    }

    #[test]
    fn test_missing_required_fields() {
        let mut remote = RemoteOrder::new("1", "ETHUSDT").with_side("buy");
        remote.order_id = None;
        assert_eq!(
            import_remote(&remote, "X"),
            Err(ImportError::MissingField("order_id"))
        );

        let mut remote = RemoteOrder::new("1", "ETHUSDT").with_side("buy");
        remote.symbol = None;
        assert_eq!(
            import_remote(&remote, "X"),
            Err(ImportError::MissingField("symbol"))
        );

        let remote = RemoteOrder::new("1", "ETHUSDT")
            .with_side("buy")
            .with_quantities(dec!(-1), dec!(0));
        assert!(matches!(
            import_remote(&remote, "X"),
            Err(ImportError::InvalidField { field: "origQty", .. })
        ));
    }

    #[test]
    fn test_missing_side_defaults_to_buy() {
        let remote = RemoteOrder::new("x1", "BTC").with_status("NEW");
        let record = import_remote(&remote, "PAPER").unwrap();
        assert_eq!(record.side, OrderSide::Buy);
        assert_eq!(record.status, OrderStatus::New);
        assert_eq!(record.venue_order_id.as_deref(), Some("x1"));
    }

    #[test]
    fn test_unrecognized_side_defaults_to_buy() {
        let remote = RemoteOrder::new("x2", "BTC").with_side("sideways");
        let record = import_remote(&remote, "PAPER").unwrap();
        assert_eq!(record.side, OrderSide::Buy);
    }

    #[test]
    fn test_already_suffixed_symbol_kept() {
        let remote = RemoteOrder::new("9", "SOLUSDT.PAPER").with_side("buy");
        let record = import_remote(&remote, "PAPER").unwrap();
        assert_eq!(record.symbol, "SOLUSDT.PAPER");
    }
}
