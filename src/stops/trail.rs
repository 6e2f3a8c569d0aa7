//! Single trailing stop and its per-price state machine.
//!
//! `ARMED -> (ratchet)* -> TRIGGERED`. The reference price only moves in the
//! position's favor; the stop is derived from it on every observation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::orders::OrderId;
use crate::types::OrderSide;

/// Rejected trail parameters, surfaced synchronously to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrailConfigError {
    #[error("Exactly one of trail_pct or trail_usd is required, got neither")]
    NoTrailParameter,

    #[error("Exactly one of trail_pct or trail_usd is required, got both")]
    BothTrailParameters,

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: Decimal },
}

/// Distance between reference price and stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrailDistance {
    /// Fraction of the reference price (0.01 = 1%)
    Percent(Decimal),
    /// Absolute price distance in quote currency
    Absolute(Decimal),
}

impl TrailDistance {
    /// Validate the mutually exclusive pct/usd pair.
    pub fn from_params(
        trail_pct: Option<Decimal>,
        trail_usd: Option<Decimal>,
    ) -> Result<Self, TrailConfigError> {
        let distance = match (trail_pct, trail_usd) {
            (None, None) => return Err(TrailConfigError::NoTrailParameter),
            (Some(_), Some(_)) => return Err(TrailConfigError::BothTrailParameters),
            (Some(pct), None) => {
                ensure_positive("trail_pct", pct)?;
                TrailDistance::Percent(pct)
            }
            (None, Some(usd)) => {
                ensure_positive("trail_usd", usd)?;
                TrailDistance::Absolute(usd)
            }
        };
        Ok(distance)
    }

    /// Minimum favorable fractional move that ratchets the reference.
    fn threshold(&self, price: Decimal) -> Decimal {
        match *self {
            TrailDistance::Percent(pct) => pct,
            TrailDistance::Absolute(usd) => usd / price,
        }
    }

    fn stop_from(&self, reference: Decimal, side: OrderSide) -> Decimal {
        match (*self, side) {
            (TrailDistance::Percent(pct), OrderSide::Buy) => reference * (Decimal::ONE - pct),
            (TrailDistance::Percent(pct), OrderSide::Sell) => reference * (Decimal::ONE + pct),
            (TrailDistance::Absolute(usd), OrderSide::Buy) => reference - usd,
            (TrailDistance::Absolute(usd), OrderSide::Sell) => reference + usd,
        }
    }

    /// Short label used inside trail ids.
    pub fn label(&self) -> String {
        match self {
            TrailDistance::Percent(pct) => format!("pct={}", pct.normalize()),
            TrailDistance::Absolute(usd) => format!("usd={}", usd.normalize()),
        }
    }
}

pub(crate) fn ensure_positive(field: &'static str, value: Decimal) -> Result<(), TrailConfigError> {
    if value > Decimal::ZERO {
        Ok(())
    } else {
        Err(TrailConfigError::NonPositive { field, value })
    }
}

/// What one price observation did to a trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailStep {
    /// First observation: reference set, never a trigger
    WarmUp,
    Holding { stop: Decimal },
    Ratcheted { reference: Decimal, stop: Decimal },
    /// Price crossed the stop. Terminal.
    Triggered { stop: Decimal },
    /// Trail had already triggered; observation ignored
    Spent,
}

/// One active protective trail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrailingStop {
    pub trail_id: String,
    /// Composite `BASE.VENUE` symbol
    pub symbol: String,
    /// Side of the protected position (`Buy` = long)
    pub side: OrderSide,
    pub trail_pct: Option<Decimal>,
    pub trail_usd: Option<Decimal>,
    pub quantity: Decimal,
    pub linked_order_id: Option<OrderId>,
    pub triggered: bool,
    pub ref_price: Option<Decimal>,
    pub current_stop_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl TrailingStop {
    pub fn new(
        trail_id: impl Into<String>,
        symbol: impl Into<String>,
        side: OrderSide,
        distance: TrailDistance,
        quantity: Decimal,
        linked_order_id: Option<OrderId>,
    ) -> Self {
        let (trail_pct, trail_usd) = match distance {
            TrailDistance::Percent(pct) => (Some(pct), None),
            TrailDistance::Absolute(usd) => (None, Some(usd)),
        };
        Self {
            trail_id: trail_id.into(),
            symbol: symbol.into(),
            side,
            trail_pct,
            trail_usd,
            quantity,
            linked_order_id,
            triggered: false,
            ref_price: None,
            current_stop_price: None,
            created_at: Utc::now(),
        }
    }

    pub fn distance(&self) -> TrailDistance {
        match (self.trail_pct, self.trail_usd) {
            (Some(pct), _) => TrailDistance::Percent(pct),
            (None, Some(usd)) => TrailDistance::Absolute(usd),
            // new() always sets exactly one
            (None, None) => TrailDistance::Absolute(Decimal::ZERO),
        }
    }

    /// Side of the protective order fired on trigger.
    pub fn exit_side(&self) -> OrderSide {
        self.side.opposite()
    }

    /// Feed one price. Callers must only pass strictly positive prices.
    pub fn observe(&mut self, price: Decimal) -> TrailStep {
        if self.triggered {
            return TrailStep::Spent;
        }
        let distance = self.distance();

        let Some(reference) = self.ref_price else {
            self.ref_price = Some(price);
            self.current_stop_price = Some(distance.stop_from(price, self.side));
            return TrailStep::WarmUp;
        };

        let favorable_move = match self.side {
            OrderSide::Buy => (price - reference) / reference,
            OrderSide::Sell => (reference - price) / reference,
        };

        let mut ratcheted = false;
        let mut reference = reference;
        if favorable_move > distance.threshold(price) {
            reference = price;
            self.ref_price = Some(price);
            ratcheted = true;
        }

        let stop = distance.stop_from(reference, self.side);
        self.current_stop_price = Some(stop);

        let crossed = match self.side {
            OrderSide::Buy => price <= stop,
            OrderSide::Sell => price >= stop,
        };
        if crossed {
            self.triggered = true;
            TrailStep::Triggered { stop }
        } else if ratcheted {
            TrailStep::Ratcheted { reference, stop }
        } else {
            TrailStep::Holding { stop }
        }
    }
}
