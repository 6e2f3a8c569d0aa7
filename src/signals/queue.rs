//! Priority mailbox between signal producers and an `EventBus`.
//!
//! Ordering is strict on priority and FIFO among equal priorities. Delivery
//! is at-most-once: events still queued when the dispatcher stops stay in
//! the heap, and a failed publish is not retried.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use futures_util::FutureExt;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::event::{EventBus, QueuedEvent};
use crate::metrics;
use crate::supervisor::panic_message;

#[derive(Debug)]
struct HeapEntry {
    priority: f64,
    seq: u64,
    event: QueuedEvent,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // max-heap: higher priority first, then lower sequence (earlier arrival)
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl Eq for HeapEntry {}

#[derive(Debug, Default)]
struct Shared {
    heap: Mutex<BinaryHeap<HeapEntry>>,
    seq: AtomicU64,
    notify: Notify,
}

impl Shared {
    fn try_pop(&self) -> Option<QueuedEvent> {
        let mut heap = self.heap.lock().unwrap_or_else(|e| e.into_inner());
        heap.pop().map(|entry| entry.event)
    }

    async fn pop(&self) -> QueuedEvent {
        loop {
            let notified = self.notify.notified();
            if let Some(event) = self.try_pop() {
                return event;
            }
            notified.await;
        }
    }
}

/// Priority queue with an optional background dispatcher.
#[derive(Debug, Default)]
pub struct SignalPriorityQueue {
    shared: Arc<Shared>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl SignalPriorityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue and wake one waiting consumer.
    pub fn put(&self, mut event: QueuedEvent) {
        if event.priority.is_nan() {
            warn!(topic = %event.topic, "NaN priority replaced with 0.0");
            event.priority = 0.0;
        }
        let seq = self.shared.seq.fetch_add(1, Ordering::Relaxed);
        {
            let mut heap = self.shared.heap.lock().unwrap_or_else(|e| e.into_inner());
            heap.push(HeapEntry {
                priority: event.priority,
                seq,
                event,
            });
        }
        self.shared.notify.notify_one();
    }

    /// Highest-priority event, waiting while the queue is empty.
    pub async fn get(&self) -> QueuedEvent {
        self.shared.pop().await
    }

    /// Highest-priority event if one is queued.
    pub fn try_get(&self) -> Option<QueuedEvent> {
        self.shared.try_pop()
    }

    pub fn len(&self) -> usize {
        self.shared.heap.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_running(&self) -> bool {
        self.dispatcher
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Spawn the dispatch loop. Returns false if one is already running.
    pub fn start(&self, bus: Arc<dyn EventBus>) -> bool {
        let mut slot = self.dispatcher.lock().unwrap_or_else(|e| e.into_inner());
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            warn!("Signal dispatcher already running");
            return false;
        }
        let shared = self.shared.clone();
        *slot = Some(tokio::spawn(dispatch_loop(shared, bus)));
        info!("Signal dispatcher started");
        true
    }

    /// Cancel the dispatcher and wait until it has fully exited.
    pub async fn stop(&self) {
        let handle = self
            .dispatcher
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some(handle) = handle else {
            return;
        };

        handle.abort();
        if let Err(e) = handle.await {
            if e.is_panic() {
                error!("Signal dispatcher panicked before stop");
            }
        }
        info!(pending = self.len(), "Signal dispatcher stopped");
    }
}

async fn dispatch_loop(shared: Arc<Shared>, bus: Arc<dyn EventBus>) {
    loop {
        let event = shared.pop().await;

        if event.is_expired_at(Utc::now()) {
            debug!(topic = %event.topic, expires_at = ?event.expires_at, "Expired signal dropped");
            metrics::record_signal_dropped("expired");
            continue;
        }

        let topic = event.topic.clone();
        match AssertUnwindSafe(bus.publish(event)).catch_unwind().await {
            Ok(Ok(())) => metrics::record_signal_dispatched(&topic),
            Ok(Err(e)) => {
                warn!(topic = %topic, error = %e, "Signal publish failed");
                metrics::record_signal_dropped("publish_error");
            }
            Err(panic_info) => {
                error!(
                    topic = %topic,
                    panic_msg = %panic_message(panic_info.as_ref()),
                    "Event bus panicked during publish"
                );
                metrics::record_signal_dropped("publish_panic");
            }
        }
    }
}
