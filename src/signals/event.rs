//! Queued signal events and the downstream bus they are published to.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A signal waiting for dispatch. Higher `priority` goes first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedEvent {
    pub topic: String,
    /// Opaque payload forwarded to the bus unchanged
    pub data: serde_json::Value,
    pub priority: f64,
    pub expires_at: Option<DateTime<Utc>>,
    pub source: Option<String>,
}

impl QueuedEvent {
    pub fn new(topic: impl Into<String>, data: serde_json::Value, priority: f64) -> Self {
        Self {
            topic: topic.into(),
            data,
            priority,
            expires_at: None,
            source: None,
        }
    }

    #[must_use]
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Expire `ttl` from now.
    #[must_use]
    pub fn with_ttl(self, ttl: chrono::Duration) -> Self {
        self.with_expiry(Utc::now() + ttl)
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("Event bus unavailable: {0}")]
    Unavailable(String),

    #[error("Event rejected by bus: {0}")]
    Rejected(String),
}

/// Downstream consumer of dispatched signals.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, event: QueuedEvent) -> Result<(), PublishError>;
}

/// Bus that only logs. Used when no downstream consumer is wired.
#[derive(Debug, Default)]
pub struct TracingEventBus;

#[async_trait]
impl EventBus for TracingEventBus {
    async fn publish(&self, event: QueuedEvent) -> Result<(), PublishError> {
        tracing::info!(
            topic = %event.topic,
            priority = event.priority,
            source = ?event.source,
            data = %event.data,
            "Signal dispatched"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let event = QueuedEvent::new("alpha", json!({"x": 1}), 0.5);
        assert!(!event.is_expired_at(now));

        let past = event.clone().with_expiry(now - chrono::Duration::seconds(1));
        assert!(past.is_expired_at(now));

        let future = event.with_ttl(chrono::Duration::minutes(5)).with_source("ml");
        assert!(!future.is_expired_at(now));
        assert_eq!(future.source.as_deref(), Some("ml"));
    }
}
