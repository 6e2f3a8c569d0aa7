//! Common Types Module
//!
//! Shared order vocabulary used by the store, the daemons and the venue layer.

use serde::{Deserialize, Serialize};

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// The side that closes a position opened on `self`.
    #[must_use]
    pub fn opposite(&self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }

    /// Lenient parse of vendor side strings ("buy", "BUY", "b").
    pub fn parse_vendor(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" | "b" | "bid" | "long" => Some(OrderSide::Buy),
            "sell" | "s" | "ask" | "short" => Some(OrderSide::Sell),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Order lifecycle status.
///
/// The open set is `New | PendingNew | Accepted | PartiallyFilled`; everything
/// else is terminal and never transitions further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    PendingNew,
    Accepted,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
}

impl OrderStatus {
    /// Returns true if the order is still live.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            Self::New | Self::PendingNew | Self::Accepted | Self::PartiallyFilled
        )
    }

    /// Returns true if the order is in a terminal state (no further updates expected).
    pub fn is_terminal(&self) -> bool {
        !self.is_open()
    }

    /// Map a vendor status string. Unknown strings map to `None`.
    pub fn parse_vendor(s: &str) -> Option<Self> {
        let norm = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        match norm.as_str() {
            "NEW" | "OPEN" => Some(Self::New),
            "PENDING_NEW" | "PENDING" => Some(Self::PendingNew),
            "ACCEPTED" | "ACTIVE" => Some(Self::Accepted),
            "PARTIALLY_FILLED" | "PARTIAL" => Some(Self::PartiallyFilled),
            "FILLED" | "DONE" => Some(Self::Filled),
            "CANCELED" | "CANCELLED" | "EXPIRED" => Some(Self::Canceled),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::New => "NEW",
            Self::PendingNew => "PENDING_NEW",
            Self::Accepted => "ACCEPTED",
            Self::PartiallyFilled => "PARTIALLY_FILLED",
            Self::Filled => "FILLED",
            Self::Canceled => "CANCELED",
            Self::Rejected => "REJECTED",
        };
        write!(f, "{}", s)
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Market,
    Limit,
    StopMarket,
    StopLimit,
}

impl OrderType {
    /// Map a vendor type string; anything unrecognized becomes `Limit`.
    pub fn from_vendor(s: Option<&str>) -> Self {
        let Some(s) = s else {
            return Self::Limit;
        };
        match s.trim().to_ascii_uppercase().replace(['-', ' '], "_").as_str() {
            "MARKET" => Self::Market,
            "STOP" | "STOP_MARKET" | "STOP_LOSS" => Self::StopMarket,
            "STOP_LIMIT" | "STOP_LOSS_LIMIT" => Self::StopLimit,
            _ => Self::Limit,
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Market => write!(f, "MARKET"),
            Self::Limit => write!(f, "LIMIT"),
            Self::StopMarket => write!(f, "STOP_MARKET"),
            Self::StopLimit => write!(f, "STOP_LIMIT"),
        }
    }
}

/// Time-in-force policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    #[default]
    Gtc,
    Ioc,
    Fok,
    Day,
}

impl TimeInForce {
    /// Map a vendor TIF string; unknown values fall back to GTC.
    pub fn from_vendor(s: Option<&str>) -> Self {
        match s.map(|v| v.trim().to_ascii_uppercase()).as_deref() {
            Some("IOC") => Self::Ioc,
            Some("FOK") => Self::Fok,
            Some("DAY") => Self::Day,
            _ => Self::Gtc,
        }
    }
}

impl std::fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gtc => write!(f, "GTC"),
            Self::Ioc => write!(f, "IOC"),
            Self::Fok => write!(f, "FOK"),
            Self::Day => write!(f, "DAY"),
        }
    }
}

/// Venue part of a `BASE.VENUE` composite symbol.
///
/// Returns `None` when the symbol carries no venue suffix.
pub fn venue_of(symbol: &str) -> Option<&str> {
    symbol
        .rsplit_once('.')
        .map(|(_, venue)| venue)
        .filter(|v| !v.is_empty())
}

/// Base part of a `BASE.VENUE` composite symbol (the whole string if unsuffixed).
pub fn base_of(symbol: &str) -> &str {
    symbol
        .rsplit_once('.')
        .map(|(base, _)| base)
        .unwrap_or(symbol)
}

/// Build the composite symbol for `base` on `venue`, leaving already-suffixed symbols alone.
pub fn composite_symbol(base: &str, venue: &str) -> String {
    match venue_of(base) {
        Some(v) if v.eq_ignore_ascii_case(venue) => base.to_string(),
        _ => format!("{}.{}", base, venue),
    }
}
