//! In-memory delivery queue shared by the ingress and the dispatcher.
//!
//! The queue is unbounded: `push` never waits, `pop` parks the consumer on a
//! [`Notify`] until something arrives. Nothing is persisted, so events still
//! queued when the process exits are lost.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::Notify;

use super::types::EventPayload;

/// Unbounded FIFO of events awaiting delivery.
#[derive(Debug, Default)]
pub struct DeliveryQueue {
    items: Mutex<VecDeque<EventPayload>>,
    available: Notify,
}

impl DeliveryQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event to the tail. Never blocks on the consumer.
    pub fn push(&self, payload: EventPayload) {
        self.lock().push_back(payload);
        self.available.notify_one();
    }

    /// Remove the head without waiting.
    pub fn try_pop(&self) -> Option<EventPayload> {
        self.lock().pop_front()
    }

    /// Remove the head, waiting until an event is available.
    pub async fn pop(&self) -> EventPayload {
        loop {
            if let Some(payload) = self.try_pop() {
                return payload;
            }
            // A push between try_pop and here stores a permit, so this wakes.
            self.available.notified().await;
        }
    }

    /// Current number of queued events. Only meaningful for logging.
    pub fn size(&self) -> usize {
        self.lock().len()
    }

    /// Whether the queue is currently empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<EventPayload>> {
        // A panic while holding the lock cannot leave the deque half-updated.
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
