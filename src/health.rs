//! Health check HTTP endpoint for monitoring

use crate::metrics;
use crate::orders::OrderStore;
use crate::signals::SignalPriorityQueue;
use crate::stops::TrailingStopManager;
use crate::supervisor::ShutdownSignal;
use crate::venue::VenueRegistry;
use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HealthResponse {
    pub status: String, // "healthy", "stopping"
    pub version: String,
    pub open_orders: usize,
    pub tracked_orders: usize,
    pub active_trails: usize,
    pub queued_signals: usize,
    pub signal_dispatcher_running: bool,
    pub venues: Vec<String>,
    pub uptime_seconds: u64,
    pub timestamp: i64,
}

/// Read-only handles the endpoint reports on.
pub struct HealthContext {
    pub store: Arc<OrderStore>,
    pub trailing: Arc<TrailingStopManager>,
    pub signals: Arc<SignalPriorityQueue>,
    pub registry: Arc<VenueRegistry>,
    pub shutdown: ShutdownSignal,
    pub started_at: DateTime<Utc>,
}

impl HealthContext {
    pub fn snapshot(&self) -> HealthResponse {
        let now = Utc::now();
        let status = if *self.shutdown.borrow() {
            "stopping"
        } else {
            "healthy"
        };
        HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            open_orders: self.store.open_count(),
            tracked_orders: self.store.len(),
            active_trails: self.trailing.len(),
            queued_signals: self.signals.len(),
            signal_dispatcher_running: self.signals.is_running(),
            venues: self.registry.names(),
            uptime_seconds: (now - self.started_at).num_seconds().max(0) as u64,
            timestamp: now.timestamp(),
        }
    }
}

async fn health_check(State(context): State<Arc<HealthContext>>) -> Json<HealthResponse> {
    Json(context.snapshot())
}

/// Prometheus metrics endpoint
async fn metrics_endpoint() -> String {
    metrics::gather_metrics()
}

pub fn router(context: Arc<HealthContext>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_endpoint))
        .with_state(context)
}

/// Serve until the context's shutdown signal flips.
pub async fn run_health_server(port: u16, context: Arc<HealthContext>) {
    let mut shutdown = context.shutdown.clone();
    let app = router(context);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!("Health check server listening on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Health server failed to bind to {}: {}. System will continue without health endpoint.", addr, e);
            return;
        }
    };

    let graceful = async move {
        while !*shutdown.borrow() {
            if shutdown.changed().await.is_err() {
                break;
            }
        }
    };

    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(graceful).await {
        tracing::error!("Health check server failed: {}", e);
    }
}
