//! Property-based tests for ordering and ratchet invariants
//!
//! These tests use proptest to verify invariants across many random inputs,
//! catching edge cases that unit tests might miss.

use execution_core::signals::{QueuedEvent, SignalPriorityQueue};
use execution_core::stops::{TrailDistance, TrailStep, TrailingStop};
use execution_core::types::OrderSide;
use proptest::prelude::*;
use rust_decimal::Decimal;
use serde_json::json;

fn trail(side: OrderSide, distance: TrailDistance) -> TrailingStop {
    TrailingStop::new("prop", "BTCUSDT.PAPER", side, distance, Decimal::ONE, None)
}

/// Percent (0.1%..20%) or absolute (0.01..50.00) distance
fn distance_strategy() -> impl Strategy<Value = TrailDistance> {
    prop_oneof![
        (1i64..200).prop_map(|p| TrailDistance::Percent(Decimal::new(p, 3))),
        (1i64..5000).prop_map(|c| TrailDistance::Absolute(Decimal::new(c, 2))),
    ]
}

/// Cumulative price path starting at `start` cents with non-negative steps
fn rising_path(start: i64, steps: Vec<i64>) -> Vec<Decimal> {
    let mut cents = start;
    steps
        .into_iter()
        .map(|step| {
            cents += step;
            Decimal::new(cents, 2)
        })
        .collect()
}

proptest! {
    /// Dispatch order is non-increasing in priority, FIFO among equals
    #[test]
    fn queue_drains_by_priority_then_arrival(
        priorities in prop::collection::vec(0u8..5, 1..64)
    ) {
        let queue = SignalPriorityQueue::new();
        for (i, p) in priorities.iter().enumerate() {
            queue.put(QueuedEvent::new(i.to_string(), json!(null), f64::from(*p) / 4.0));
        }

        let drained: Vec<(f64, usize)> = std::iter::from_fn(|| queue.try_get())
            .map(|e| (e.priority, e.topic.parse::<usize>().unwrap()))
            .collect();

        prop_assert_eq!(drained.len(), priorities.len());
        for pair in drained.windows(2) {
            let (p0, i0) = pair[0];
            let (p1, i1) = pair[1];
            prop_assert!(p0 >= p1, "priority rose: {} then {}", p0, p1);
            if p0 == p1 {
                prop_assert!(i0 < i1, "FIFO violated at equal priority: {} then {}", i0, i1);
            }
        }
    }

    /// A higher-priority event always precedes a lower one regardless of put order
    #[test]
    fn higher_priority_always_first(
        a in 0.5f64..1.0,
        b in 0.0f64..0.5,
        a_first in any::<bool>()
    ) {
        let queue = SignalPriorityQueue::new();
        let (ea, eb) = (QueuedEvent::new("A", json!(1), a), QueuedEvent::new("B", json!(2), b));
        if a_first {
            queue.put(ea);
            queue.put(eb);
        } else {
            queue.put(eb);
            queue.put(ea);
        }
        prop_assert_eq!(queue.try_get().unwrap().topic, "A");
        prop_assert_eq!(queue.try_get().unwrap().topic, "B");
    }

    /// Long trail on a non-decreasing path: reference never falls and never triggers
    #[test]
    fn long_ratchet_is_monotonic(
        distance in distance_strategy(),
        start in 10_000i64..10_000_000,
        steps in prop::collection::vec(0i64..50_000, 1..100)
    ) {
        let mut stop = trail(OrderSide::Buy, distance);
        let mut last_ref: Option<Decimal> = None;

        for price in rising_path(start, steps) {
            let step = stop.observe(price);
            prop_assert!(!matches!(step, TrailStep::Triggered { .. }), "unexpected trigger");
            let reference = stop.ref_price.unwrap();
            if let Some(prev) = last_ref {
                prop_assert!(reference >= prev, "ref fell from {} to {}", prev, reference);
            }
            last_ref = Some(reference);
        }
    }

    /// Short trail on any path: reference never rises
    #[test]
    fn short_ratchet_never_retreats(
        distance in distance_strategy(),
        start in 10_000i64..10_000_000,
        moves in prop::collection::vec(-50_000i64..50_000, 1..100)
    ) {
        let mut stop = trail(OrderSide::Sell, distance);
        let mut cents = start;
        let mut last_ref: Option<Decimal> = None;

        for m in moves {
            cents = (cents + m).max(1);
            stop.observe(Decimal::new(cents, 2));
            if let Some(reference) = stop.ref_price {
                if let Some(prev) = last_ref {
                    prop_assert!(reference <= prev, "ref rose from {} to {}", prev, reference);
                }
                last_ref = Some(reference);
            }
            if stop.triggered {
                break;
            }
        }
    }

    /// After triggering, further observations never fire again
    #[test]
    fn trigger_is_one_shot(
        distance in distance_strategy(),
        tail in prop::collection::vec(1i64..10_000_000, 1..20)
    ) {
        let mut stop = trail(OrderSide::Buy, distance);
        stop.observe(Decimal::new(1_000_000, 2));
        // far below any stop
        prop_assert!(matches!(stop.observe(Decimal::new(1, 2)), TrailStep::Triggered { .. }), "expected trigger");
        for cents in tail {
            prop_assert_eq!(stop.observe(Decimal::new(cents, 2)), TrailStep::Spent);
        }
    }
}
