//! Vendor open-order payload.
//!
//! Field names follow the common exchange REST shape (`origQty`, `executedQty`,
//! `timeInForce`). Numeric fields accept JSON numbers or strings; anything
//! malformed deserializes to `None` rather than failing the whole listing.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One open order as reported by a venue.
///
/// Only `order_id` and `symbol` are required for import; both are still
/// `Option` here so a single bad row never poisons the batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteOrder {
    #[serde(default, alias = "orderId", deserialize_with = "lenient_string")]
    pub order_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub side: Option<String>,
    #[serde(default, rename = "type", alias = "order_type", deserialize_with = "lenient_string")]
    pub order_type: Option<String>,
    #[serde(default, rename = "origQty", alias = "quantity", deserialize_with = "lenient_decimal")]
    pub orig_qty: Option<Decimal>,
    #[serde(default, rename = "executedQty", deserialize_with = "lenient_decimal")]
    pub executed_qty: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub price: Option<Decimal>,
    #[serde(default, alias = "stopPrice", deserialize_with = "lenient_decimal")]
    pub stop_price: Option<Decimal>,
    #[serde(default, rename = "timeInForce", deserialize_with = "lenient_string")]
    pub time_in_force: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
}

impl RemoteOrder {
    /// Minimal constructor for adapters and tests.
    #[must_use]
    pub fn new(order_id: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            order_id: Some(order_id.into()),
            symbol: Some(symbol.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_side(mut self, side: &str) -> Self {
        self.side = Some(side.to_string());
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }

    #[must_use]
    pub fn with_quantities(mut self, orig: Decimal, executed: Decimal) -> Self {
        self.orig_qty = Some(orig);
        self.executed_qty = Some(executed);
        self
    }

    #[must_use]
    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    #[must_use]
    pub fn with_type(mut self, order_type: &str) -> Self {
        self.order_type = Some(order_type.to_string());
        self
    }
}

/// Strings or numbers become strings; empty strings and other shapes become `None`.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Decimal from a JSON number or numeric string; malformed values become `None`.
fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => return Ok(None),
    };
    let raw = raw.trim();
    Ok(Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok())
}
