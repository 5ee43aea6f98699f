//! Ingress endpoint handlers.
//!
//! The enqueue handler is kept thin - it only:
//! 1. Parses the body as a JSON object
//! 2. Pushes it onto the delivery queue
//! 3. Returns 202 Accepted
//!
//! Delivery happens later in the dispatcher; callers never learn whether it
//! succeeded.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::dispatch::DispatcherState;
use crate::queue::{DeliveryQueue, EventPayload, RoutingKey};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<DeliveryQueue>,
    pub routing_key: RoutingKey,
    pub dispatcher_state: watch::Receiver<DispatcherState>,
}

impl AppState {
    pub fn new(
        queue: Arc<DeliveryQueue>,
        routing_key: RoutingKey,
        dispatcher_state: watch::Receiver<DispatcherState>,
    ) -> Self {
        Self {
            queue,
            routing_key,
            dispatcher_state,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub queue_size: usize,
    pub dispatcher: DispatcherState,
}

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        queue_size: state.queue.size(),
        dispatcher: *state.dispatcher_state.borrow(),
    })
}

// =============================================================================
// Event Ingress
// =============================================================================

/// Acknowledgement of an accepted event.
#[derive(Serialize)]
pub struct EnqueueResponse {
    pub status: &'static str,
    pub data: EventPayload,
    pub target_routing_key: String,
}

/// Rejection of an unparseable request body.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error: String,
}

/// Event ingress endpoint.
///
/// Responds with the payload exactly as received; the routing key shown is
/// the one the dispatcher will stamp on it.
///
/// The body must be a JSON object, since `routing_key` is injected as a
/// top-level field. Invalid JSON and valid non-object JSON (arrays, strings,
/// numbers) are both rejected with 400 and never reach the queue.
pub async fn enqueue_event(State(state): State<AppState>, body: Bytes) -> Response {
    let payload = match EventPayload::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, body_length = body.len(), "event_rejected_invalid_json");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    status: "invalid_payload",
                    error: e.to_string(),
                }),
            )
                .into_response();
        }
    };

    let echoed = payload.clone();
    state.queue.push(payload);

    info!(
        event_action = echoed.event_action().unwrap_or("unknown"),
        dedup_key = echoed.dedup_key().unwrap_or(""),
        queue_size = state.queue.size(),
        "event_enqueued"
    );

    (
        StatusCode::ACCEPTED,
        Json(EnqueueResponse {
            status: "enqueued",
            data: echoed,
            target_routing_key: state.routing_key.as_str().to_string(),
        }),
    )
        .into_response()
}
