use async_trait::async_trait;
use execution_core::commands::paper_core;
use execution_core::config::CoreConfig;
use execution_core::engine::ExecutionCore;
use execution_core::orders::{create_oco_pair, OcoError, OcoLeg, OrderId, OrderRecord, OrderStore};
use execution_core::paper::PaperVenue;
use execution_core::reconcile::MissingOrderPolicy;
use execution_core::signals::{EventBus, PublishError, QueuedEvent};
use execution_core::types::{OrderSide, OrderStatus, OrderType};
use execution_core::venue::{
    OrderPlacer, OrderRequest, PlacedOrder, PlacementError, RemoteOrder, VenueRegistry,
};
use mockall::mock;
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::Duration;

// --- Mocks ---

mock! {
    pub Placer {}

    #[async_trait]
    impl OrderPlacer for Placer {
        async fn place_order(&self, request: OrderRequest) -> Result<PlacedOrder, PlacementError>;
    }
}

mock! {
    pub Bus {}

    #[async_trait]
    impl EventBus for Bus {
        async fn publish(&self, event: QueuedEvent) -> Result<(), PublishError>;
    }
}

fn single_paper_core() -> (ExecutionCore, Arc<PaperVenue>) {
    let (core, mut venues) = paper_core(CoreConfig::default());
    let venue = venues.remove(0);
    (core, venue)
}

// --- OCO ---

#[tokio::test]
async fn test_oco_end_to_end() {
    let (core, venue) = single_paper_core();

    let pair = core
        .create_oco_pair(
            OrderRequest::limit("entry-a", "BTCUSDT.PAPER", OrderSide::Buy, dec!(1), dec!(95)),
            OrderRequest::limit("entry-b", "BTCUSDT.PAPER", OrderSide::Sell, dec!(1), dec!(105)),
        )
        .await
        .unwrap();
    assert_eq!(venue.open_orders().len(), 2);

    // A fills externally
    let mut a = core.store().get(&pair.first.order_id_local).unwrap();
    a.status = OrderStatus::Filled;
    a.filled_qty = a.quantity;
    core.store().upsert(a, "fill");

    let report = core.oco_watcher().run_once().await;
    assert_eq!(report.resolved, 1);

    let a = core.store().get(&pair.first.order_id_local).unwrap();
    let b = core.store().get(&pair.second.order_id_local).unwrap();
    assert_eq!(a.status, OrderStatus::Filled);
    assert_eq!(b.status, OrderStatus::Canceled);
    assert!(core.store().list_open().is_empty());

    // B was actually canceled on the venue
    let listed: Vec<_> = venue.open_orders().into_iter().filter_map(|o| o.order_id).collect();
    assert!(!listed.contains(b.venue_order_id.as_ref().unwrap()));
}

#[tokio::test]
async fn test_fill_detected_by_reconciliation_then_oco_cancels_sibling() {
    let (core, venue) = single_paper_core();
    let pair = core
        .create_oco_pair(
            OrderRequest::limit("tp", "ETHUSDT.PAPER", OrderSide::Sell, dec!(2), dec!(2200)),
            OrderRequest::stop_market("sl", "ETHUSDT.PAPER", OrderSide::Sell, dec!(2), dec!(1800)),
        )
        .await
        .unwrap();

    // take-profit disappears from the venue: it filled
    venue.remove_order(pair.first.venue_order_id.as_deref().unwrap());

    let recon = core.reconciler().reconcile_once().await;
    assert_eq!(recon.closed, 1);
    assert_eq!(
        core.store().get(&pair.first.order_id_local).unwrap().status,
        OrderStatus::Filled
    );

    core.oco_watcher().run_once().await;
    assert_eq!(
        core.store().get(&pair.second.order_id_local).unwrap().status,
        OrderStatus::Canceled
    );
    assert!(venue.open_orders().is_empty());

    // both sides quiet afterwards
    assert!(core.reconciler().reconcile_once().await.is_noop());
}

#[tokio::test]
async fn test_oco_second_leg_failure_reported() {
    let store = Arc::new(OrderStore::new());

    let mut placer = MockPlacer::new();
    let mut calls = 0;
    let placer_store = store.clone();
    placer.expect_place_order().times(2).returning(move |request| {
        calls += 1;
        if calls == 2 {
            return Err(PlacementError::Rejected("post-only would cross".to_string()));
        }
        let id = OrderId::generate();
        placer_store.upsert(
            OrderRecord::new(
                id.clone(),
                request.client_key,
                request.symbol,
                request.side,
                request.order_type,
                request.quantity,
            ),
            "placement",
        );
        Ok(PlacedOrder {
            order_id_local: id,
            venue_order_id: None,
        })
    });

    let result = create_oco_pair(
        &store,
        &placer,
        OrderRequest::limit("a", "BTC.PAPER", OrderSide::Buy, dec!(1), dec!(1)),
        OrderRequest::limit("b", "BTC.PAPER", OrderSide::Sell, dec!(1), dec!(2)),
    )
    .await;

    assert!(matches!(result, Err(OcoError::LegFailed { leg: OcoLeg::Second, .. })));
    // first leg stays as an unlinked order
    let orders = store.list_all();
    assert_eq!(orders.len(), 1);
    assert!(orders[0].oco_group_id.is_none());
}

// --- Reconciliation ---

#[tokio::test]
async fn test_listed_row_without_symbol_keeps_oco_pair_intact() {
    let (core, venue) = single_paper_core();
    let pair = core
        .create_oco_pair(
            OrderRequest::limit("tp", "BTCUSDT.PAPER", OrderSide::Sell, dec!(1), dec!(110)),
            OrderRequest::stop_market("sl", "BTCUSDT.PAPER", OrderSide::Sell, dec!(1), dec!(90)),
        )
        .await
        .unwrap();

    // venue re-lists the take-profit without a symbol
    let tp_id = pair.first.venue_order_id.clone().unwrap();
    let mut relisted = venue.remove_order(&tp_id).unwrap();
    relisted.symbol = None;
    venue.add_order(relisted);

    let report = core.reconciler().reconcile_once().await;
    assert_eq!(report.closed, 0);
    assert_eq!(report.imported, 0);
    assert_eq!(report.malformed, 0);

    let oco = core.oco_watcher().run_once().await;
    assert_eq!(oco.resolved, 0);
    assert_eq!(
        core.store().get(&pair.first.order_id_local).unwrap().status,
        OrderStatus::New
    );
    assert_eq!(
        core.store().get(&pair.second.order_id_local).unwrap().status,
        OrderStatus::New
    );
    assert_eq!(venue.open_orders().len(), 2);
}

#[tokio::test]
async fn test_reconciliation_idempotent_against_paper_venue() {
    let (core, venue) = single_paper_core();
    venue.add_order(
        RemoteOrder::new("ext-1", "SOLUSDT")
            .with_side("BUY")
            .with_status("NEW")
            .with_quantities(dec!(1.0), dec!(0.3)),
    );
    venue.add_order(RemoteOrder::new("ext-2", "SOLUSDT").with_side("SELL"));
    core.create_oco_pair(
        OrderRequest::limit("x", "BTC.PAPER", OrderSide::Buy, dec!(1), dec!(1)),
        OrderRequest::limit("y", "BTC.PAPER", OrderSide::Sell, dec!(1), dec!(2)),
    )
    .await
    .unwrap();

    let first = core.reconciler().reconcile_once().await;
    assert_eq!(first.imported, 2);
    assert_eq!(first.closed, 0);

    let second = core.reconciler().reconcile_once().await;
    assert_eq!(second.imported, 0);
    assert_eq!(second.closed, 0);

    let partial = core
        .store()
        .list_open()
        .into_iter()
        .find(|o| o.venue_order_id.as_deref() == Some("ext-1"))
        .unwrap();
    assert_eq!(partial.filled_qty, dec!(0.3));
    assert_eq!(partial.quantity, dec!(1.0));
    assert_eq!(partial.status, OrderStatus::New);
}

#[tokio::test]
async fn test_failing_venue_isolated() {
    let config = CoreConfig {
        paper_venues: vec!["GOOD".to_string(), "BAD".to_string()],
        missing_order_policy: MissingOrderPolicy::AssumeCanceled,
        ..CoreConfig::default()
    };
    let (core, venues) = paper_core(config);
    let (good, bad) = (venues[0].clone(), venues[1].clone());

    core.create_oco_pair(
        OrderRequest::limit("a", "BTC.BAD", OrderSide::Buy, dec!(1), dec!(1)),
        OrderRequest::limit("b", "BTC.BAD", OrderSide::Sell, dec!(1), dec!(2)),
    )
    .await
    .unwrap();
    good.add_order(RemoteOrder::new("g-1", "ETH").with_side("BUY"));
    bad.set_failing(true);

    let report = core.reconciler().reconcile_once().await;
    assert_eq!(report.venues_failed, vec!["BAD".to_string()]);
    assert_eq!(report.imported, 1);
    // local orders on the failing venue are untouched
    assert_eq!(report.closed, 0);
    assert_eq!(core.store().open_count(), 3);
}

// --- Trailing stops ---

#[tokio::test]
async fn test_trailing_stop_triggers_once_on_paper_venue() {
    let (core, venue) = single_paper_core();
    venue.set_price("BTCUSDT", dec!(100));

    let trail_id = core
        .trailing()
        .add_trailing_stop("BTCUSDT.PAPER", OrderSide::Buy, Some(dec!(0.05)), None, dec!(0.5), None)
        .unwrap();

    core.trailing().tick().await; // warm-up at 100
    venue.set_price("BTCUSDT", dec!(120));
    core.trailing().tick().await; // ratchet to 120, stop 114
    assert_eq!(
        core.trailing().get(&trail_id).unwrap().current_stop_price,
        Some(dec!(114.00))
    );

    venue.set_price("BTCUSDT", dec!(113));
    let report = core.trailing().tick().await;
    assert_eq!(report.triggered, 1);
    assert!(core.trailing().list_active_trails().is_empty());

    let protective: Vec<_> = core
        .store()
        .list_open()
        .into_iter()
        .filter(|o| o.client_key.starts_with("trail:"))
        .collect();
    assert_eq!(protective.len(), 1);
    assert_eq!(protective[0].side, OrderSide::Sell);
    assert_eq!(protective[0].order_type, OrderType::StopMarket);
    assert_eq!(protective[0].stop_price, Some(dec!(114.00)));
    assert_eq!(protective[0].quantity, dec!(0.5));

    venue.set_price("BTCUSDT", dec!(90));
    core.trailing().tick().await;
    core.trailing().tick().await;
    assert_eq!(core.store().len(), 1);
}

// --- Signal queue ---

#[tokio::test]
async fn test_signal_priority_and_expiry_through_bus() {
    let (core, _venue) = single_paper_core();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let mut bus = MockBus::new();
    let log = seen.clone();
    bus.expect_publish().returning(move |event| {
        log.lock().unwrap().push(event.topic.clone());
        let _ = tx.send(event.topic);
        Ok(())
    });

    core.signals().put(QueuedEvent::new("B", json!({"p": 0.4}), 0.4));
    core.signals().put(
        QueuedEvent::new("stale", json!({}), 0.99)
            .with_expiry(chrono::Utc::now() - chrono::Duration::seconds(1)),
    );
    core.signals().put(QueuedEvent::new("A", json!({"p": 0.9}), 0.9));

    core.start(Some(Arc::new(bus)));
    for _ in 0..2 {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
    }
    core.shutdown().await;

    assert_eq!(*seen.lock().unwrap(), vec!["A".to_string(), "B".to_string()]);
}

#[tokio::test]
async fn test_stop_waits_for_dispatcher_exit() {
    let (core, _venue) = single_paper_core();
    let mut bus = MockBus::new();
    bus.expect_publish().returning(|_| Ok(()));
    core.signals().start(Arc::new(bus));

    core.signals().stop().await;
    assert!(!core.signals().is_running());

    // nothing dispatches after stop resolved
    core.signals().put(QueuedEvent::new("after", json!(null), 1.0));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(core.signals().len(), 1);
}

// --- Composition ---

#[tokio::test]
async fn test_custom_registry_and_placer() {
    let venue = Arc::new(PaperVenue::new("SIM"));
    let registry = VenueRegistry::new().with_venue("SIM", venue.clone());
    let core = ExecutionCore::new(CoreConfig::default(), registry, |_store| {
        let mut placer = MockPlacer::new();
        placer
            .expect_place_order()
            .returning(|_| Err(PlacementError::Rejected("read-only".to_string())));
        Arc::new(placer) as Arc<dyn OrderPlacer>
    });

    let result = core
        .create_oco_pair(
            OrderRequest::limit("a", "BTC.SIM", OrderSide::Buy, dec!(1), dec!(1)),
            OrderRequest::limit("b", "BTC.SIM", OrderSide::Sell, dec!(1), dec!(2)),
        )
        .await;
    assert!(matches!(result, Err(OcoError::LegFailed { leg: OcoLeg::First, .. })));
    assert!(core.store().is_empty());
}
