//! Priority-ordered, expiry-aware signal fan-out.

mod event;
mod queue;

pub use event::{EventBus, PublishError, QueuedEvent, TracingEventBus};
#[cfg(test)]
pub use event::MockEventBus;
pub use queue::SignalPriorityQueue;
