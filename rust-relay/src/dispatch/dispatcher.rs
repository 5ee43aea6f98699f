//! The single consumer draining the delivery queue.
//!
//! The loop pops an event, waits for a rate-limit slot, stamps this
//! instance's routing key on it and posts it. A response that is not JSON,
//! or no response at all, sends the event back to the tail of the queue;
//! there is no retry limit. The loop only ends when the shutdown token is
//! cancelled.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::dispatch::client::EventsClient;
use crate::queue::{DeliveryQueue, EventPayload, RoutingKey};
use crate::ratelimit::RateLimiter;

/// Whether the dispatcher is working through queued events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatcherState {
    /// Queue observed empty; waiting for the next event.
    Idle,
    /// Events are being popped and delivered.
    Draining,
}

/// Result of a single delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The API answered with JSON; the event is done.
    Delivered,
    /// No usable answer; the event went back to the tail.
    Requeued,
}

/// Counters accumulated over the dispatcher's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Delivery attempts started (one rate-limit slot each).
    pub attempts: u64,
    /// Attempts that got a JSON response.
    pub delivered: u64,
    /// Attempts whose event was re-queued.
    pub requeued: u64,
    /// Draining → idle transitions, one log line each.
    pub idle_transitions: u64,
}

/// Rate-limited consumer of the delivery queue.
pub struct Dispatcher {
    queue: Arc<DeliveryQueue>,
    limiter: RateLimiter,
    client: EventsClient,
    routing_key: RoutingKey,
    state: watch::Sender<DispatcherState>,
    stats: DispatchStats,
}

impl Dispatcher {
    /// Create a dispatcher.
    ///
    /// It starts out `Draining` so the first empty check after boot logs
    /// that the relay is waiting for events.
    pub fn new(
        queue: Arc<DeliveryQueue>,
        limiter: RateLimiter,
        client: EventsClient,
        routing_key: RoutingKey,
    ) -> Self {
        let (state, _) = watch::channel(DispatcherState::Draining);
        Self {
            queue,
            limiter,
            client,
            routing_key,
            state,
            stats: DispatchStats::default(),
        }
    }

    /// Watch the idle/draining state.
    pub fn subscribe(&self) -> watch::Receiver<DispatcherState> {
        self.state.subscribe()
    }

    /// Current idle/draining state.
    pub fn state(&self) -> DispatcherState {
        *self.state.borrow()
    }

    /// Counters so far.
    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Drain the queue until `shutdown` is cancelled.
    pub async fn run(mut self, shutdown: CancellationToken) -> DispatchStats {
        info!(
            endpoint = %self.client.endpoint(),
            rate_limit_calls = self.limiter.max_calls(),
            "dispatcher_started"
        );

        while let Some(payload) = self.next_payload(&shutdown).await {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    self.queue.push(payload);
                    break;
                }
                _ = self.limiter.acquire() => {}
            }

            self.attempt(payload).await;
        }

        info!(
            attempts = self.stats.attempts,
            delivered = self.stats.delivered,
            requeued = self.stats.requeued,
            queue_size = self.queue.size(),
            "dispatcher_stopped"
        );

        self.stats
    }

    /// Deliver one event, re-queueing it at the tail if unconfirmed.
    ///
    /// Does not wait for the rate limiter; `run` acquires a slot first.
    pub async fn attempt(&mut self, mut payload: EventPayload) -> AttemptOutcome {
        self.stats.attempts += 1;
        payload.set_routing_key(self.routing_key.as_str());

        info!(
            event_action = payload.event_action().unwrap_or("unknown"),
            dedup_key = payload.dedup_key().unwrap_or(""),
            routing_key = %self.routing_key.redacted(),
            "event_sending"
        );

        match self.client.send_event(&payload).await {
            Ok(response) => {
                if response.is_success() {
                    info!(
                        status_code = response.status_code,
                        response = %response.body,
                        "event_delivered"
                    );
                } else {
                    // JSON-bodied rejections are not retried.
                    warn!(
                        status_code = response.status_code,
                        response = %response.body,
                        "event_rejected"
                    );
                }
                self.stats.delivered += 1;
                AttemptOutcome::Delivered
            }
            Err(e) => {
                warn!(
                    error = %e,
                    status_code = ?e.status_code(),
                    queue_size = self.queue.size(),
                    "event_requeued"
                );
                self.queue.push(payload);
                self.stats.requeued += 1;
                AttemptOutcome::Requeued
            }
        }
    }

    /// Pop the next event, waiting while the queue is empty.
    ///
    /// Returns `None` once `shutdown` is cancelled.
    async fn next_payload(&mut self, shutdown: &CancellationToken) -> Option<EventPayload> {
        if shutdown.is_cancelled() {
            return None;
        }

        if let Some(payload) = self.queue.try_pop() {
            self.mark_draining();
            return Some(payload);
        }

        self.mark_idle();

        let payload = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return None,
            payload = self.queue.pop() => payload,
        };

        self.mark_draining();
        Some(payload)
    }

    fn mark_draining(&mut self) {
        let queue_size = self.queue.size();
        if self.state() == DispatcherState::Idle {
            info!(queue_size = queue_size, "dispatcher_draining");
            self.state.send_replace(DispatcherState::Draining);
        } else {
            info!(queue_size = queue_size, "dispatcher_queue_size");
        }
    }

    fn mark_idle(&mut self) {
        if self.state() == DispatcherState::Draining {
            info!("dispatcher_idle");
            self.state.send_replace(DispatcherState::Idle);
            self.stats.idle_transitions += 1;
        }
    }
}
