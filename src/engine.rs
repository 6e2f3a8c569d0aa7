//! Composition root.
//!
//! Builds the single `OrderStore`, hands it to every daemon, and owns their
//! lifecycle: `start` spawns, `shutdown` signals and waits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::CoreConfig;
use crate::health::{self, HealthContext};
use crate::orders::{create_oco_pair, OcoError, OcoPair, OcoWatcher, OrderStore};
use crate::reconcile::ReconciliationDaemon;
use crate::signals::{EventBus, SignalPriorityQueue};
use crate::stops::TrailingStopManager;
use crate::supervisor::{panic_message, ShutdownSignal};
use crate::venue::{OrderPlacer, OrderRequest, VenueRegistry};

pub struct ExecutionCore {
    config: CoreConfig,
    store: Arc<OrderStore>,
    registry: Arc<VenueRegistry>,
    placer: Arc<dyn OrderPlacer>,
    reconciler: Arc<ReconciliationDaemon>,
    oco: Arc<OcoWatcher>,
    trailing: Arc<TrailingStopManager>,
    signals: Arc<SignalPriorityQueue>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<JoinSet<()>>,
    started: AtomicBool,
}

impl ExecutionCore {
    /// `make_placer` receives the shared store; placers must write their
    /// records into it.
    pub fn new<F>(config: CoreConfig, registry: VenueRegistry, make_placer: F) -> Self
    where
        F: FnOnce(Arc<OrderStore>) -> Arc<dyn OrderPlacer>,
    {
        let store = Arc::new(OrderStore::new());
        let registry = Arc::new(registry);
        let placer = make_placer(store.clone());

        let reconciler = Arc::new(ReconciliationDaemon::new(
            store.clone(),
            registry.clone(),
            config.reconcile(),
        ));
        let oco = Arc::new(OcoWatcher::new(store.clone(), registry.clone(), config.oco()));
        let trailing = Arc::new(TrailingStopManager::new(
            registry.clone(),
            placer.clone(),
            config.trailing(),
        ));
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            config,
            store,
            registry,
            placer,
            reconciler,
            oco,
            trailing,
            signals: Arc::new(SignalPriorityQueue::new()),
            shutdown_tx,
            tasks: Mutex::new(JoinSet::new()),
            started: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<OrderStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<VenueRegistry> {
        &self.registry
    }

    pub fn reconciler(&self) -> &Arc<ReconciliationDaemon> {
        &self.reconciler
    }

    pub fn oco_watcher(&self) -> &Arc<OcoWatcher> {
        &self.oco
    }

    pub fn trailing(&self) -> &Arc<TrailingStopManager> {
        &self.trailing
    }

    pub fn signals(&self) -> &Arc<SignalPriorityQueue> {
        &self.signals
    }

    /// Place two linked legs through the configured placer.
    pub async fn create_oco_pair(
        &self,
        first: OrderRequest,
        second: OrderRequest,
    ) -> Result<OcoPair, OcoError> {
        create_oco_pair(&self.store, self.placer.as_ref(), first, second).await
    }

    fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown_tx.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::SeqCst) && !*self.shutdown_tx.borrow()
    }

    /// Spawn every daemon. `bus`, when given, receives queued signals.
    /// Calling `start` twice is a no-op.
    pub fn start(&self, bus: Option<Arc<dyn EventBus>>) {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("ExecutionCore already started");
            return;
        }

        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.spawn(self.reconciler.clone().run(self.shutdown_signal()));
        tasks.spawn(self.oco.clone().run(self.shutdown_signal()));
        tasks.spawn(self.trailing.clone().run(self.shutdown_signal()));

        if let Some(port) = self.config.health_port {
            let context = HealthContext {
                store: self.store.clone(),
                trailing: self.trailing.clone(),
                signals: self.signals.clone(),
                registry: self.registry.clone(),
                shutdown: self.shutdown_signal(),
                started_at: chrono::Utc::now(),
            };
            tasks.spawn(health::run_health_server(port, Arc::new(context)));
        }

        if let Some(bus) = bus {
            self.signals.start(bus);
        }

        info!(
            venues = ?self.registry.names(),
            daemons = tasks.len(),
            "ExecutionCore started"
        );
    }

    /// Signal every daemon, wait for all of them, then stop the signal queue.
    pub async fn shutdown(&self) {
        if self.shutdown_tx.send_replace(true) {
            return;
        }
        info!("ExecutionCore shutting down");

        let mut tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(|e| e.into_inner()));
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                if e.is_panic() {
                    error!(panic_msg = %panic_message(e.into_panic().as_ref()), "Daemon task panicked");
                } else {
                    warn!(error = %e, "Daemon task ended abnormally");
                }
            }
        }

        self.signals.stop().await;
        info!(open_orders = self.store.open_count(), "ExecutionCore stopped");
    }
}
