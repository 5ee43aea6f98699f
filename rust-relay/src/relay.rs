//! The relay context: one queue and one routing key per process.
//!
//! `Relay` owns the pieces the ingress and the dispatcher share and hands
//! them out at construction time, so nothing lives in globals.

use std::sync::Arc;

use axum::Router;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::dispatch::{DispatchStats, Dispatcher, DispatcherState, EventsClient};
use crate::queue::{DeliveryQueue, RoutingKey};
use crate::ratelimit::RateLimiter;
use crate::web::{self, AppState};

/// Shared state for a running relay.
#[derive(Clone)]
pub struct Relay {
    queue: Arc<DeliveryQueue>,
    routing_key: RoutingKey,
}

impl Relay {
    /// Create a relay with an empty queue for a verified routing key.
    pub fn new(routing_key: RoutingKey) -> Self {
        Self {
            queue: Arc::new(DeliveryQueue::new()),
            routing_key,
        }
    }

    pub fn queue(&self) -> &Arc<DeliveryQueue> {
        &self.queue
    }

    pub fn routing_key(&self) -> &RoutingKey {
        &self.routing_key
    }

    /// Build the dispatcher that drains this relay's queue.
    pub fn dispatcher(&self, client: EventsClient, limiter: RateLimiter) -> Dispatcher {
        Dispatcher::new(
            Arc::clone(&self.queue),
            limiter,
            client,
            self.routing_key.clone(),
        )
    }

    /// Spawn the dispatcher as a task stopped by `shutdown`.
    pub fn spawn_dispatcher(
        &self,
        client: EventsClient,
        limiter: RateLimiter,
        shutdown: CancellationToken,
    ) -> DispatcherHandle {
        let dispatcher = self.dispatcher(client, limiter);
        let state = dispatcher.subscribe();
        let task = tokio::spawn(dispatcher.run(shutdown.clone()));

        DispatcherHandle {
            task,
            state,
            shutdown,
        }
    }

    /// Ingress router bound to this relay's queue.
    pub fn router(&self, dispatcher_state: watch::Receiver<DispatcherState>) -> Router {
        web::router(AppState::new(
            Arc::clone(&self.queue),
            self.routing_key.clone(),
            dispatcher_state,
        ))
    }
}

/// Handle to a spawned dispatcher task.
pub struct DispatcherHandle {
    task: JoinHandle<DispatchStats>,
    state: watch::Receiver<DispatcherState>,
    shutdown: CancellationToken,
}

impl DispatcherHandle {
    /// Watch the dispatcher's idle/draining state.
    pub fn state(&self) -> watch::Receiver<DispatcherState> {
        self.state.clone()
    }

    /// Cancel the dispatcher and wait for it to finish.
    pub async fn stop(self) -> DispatchStats {
        self.shutdown.cancel();
        match self.task.await {
            Ok(stats) => stats,
            Err(e) => {
                error!(error = %e, "dispatcher_task_failed");
                DispatchStats::default()
            }
        }
    }
}
