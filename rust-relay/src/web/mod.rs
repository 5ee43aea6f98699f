//! Web server module for the event ingress.
//!
//! This module provides a thin, fast web server that:
//! - Accepts JSON events on `POST /`
//! - Immediately enqueues them for the dispatcher
//! - Returns 202 Accepted without waiting for delivery

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};

pub use handlers::{
    enqueue_event, health, AppState, EnqueueResponse, ErrorResponse, HealthResponse,
};

/// Build the ingress router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(enqueue_event))
        .route("/health", get(health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tokio::sync::watch;
    use tower::ServiceExt;

    use super::*;
    use crate::dispatch::DispatcherState;
    use crate::queue::{DeliveryQueue, RoutingKey};

    fn test_state() -> AppState {
        let (_, dispatcher_state) = watch::channel(DispatcherState::Idle);
        AppState::new(
            Arc::new(DeliveryQueue::new()),
            RoutingKey::new("R0UT1NGKEY").unwrap(),
            dispatcher_state,
        )
    }

    fn post_event(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_enqueue_returns_accepted_with_echo() {
        let state = test_state();
        let app = router(state.clone());

        let response = app
            .oneshot(post_event(r#"{"event_action":"trigger","summary":"disk full"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            json_body(response).await,
            json!({
                "status": "enqueued",
                "data": {"event_action": "trigger", "summary": "disk full"},
                "target_routing_key": "R0UT1NGKEY"
            })
        );

        assert_eq!(state.queue.size(), 1);
        let queued = state.queue.try_pop().unwrap();
        assert_eq!(queued.event_action(), Some("trigger"));
    }

    #[tokio::test]
    async fn test_enqueue_without_content_type() {
        let state = test_state();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/")
            .body(Body::from(r#"{"summary":"no header"}"#))
            .unwrap();

        let response = router(state.clone()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(state.queue.size(), 1);
    }

    #[tokio::test]
    async fn test_enqueue_preserves_arrival_order() {
        let state = test_state();

        for seq in 0..3 {
            let response = router(state.clone())
                .oneshot(post_event(&format!(r#"{{"seq":{seq}}}"#)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::ACCEPTED);
        }

        for seq in 0..3 {
            assert_eq!(state.queue.try_pop().unwrap().get("seq"), Some(&json!(seq)));
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_rejected_without_enqueue() {
        let state = test_state();

        let response = router(state.clone())
            .oneshot(post_event("{not json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["status"], "invalid_payload");
        assert!(state.queue.is_empty());
    }

    #[tokio::test]
    async fn test_non_object_json_is_rejected() {
        let state = test_state();

        let response = router(state.clone())
            .oneshot(post_event(r#"["trigger"]"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(state.queue.is_empty());
    }

    #[tokio::test]
    async fn test_get_root_not_allowed() {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/")
            .body(Body::empty())
            .unwrap();

        let response = router(test_state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_health_reports_queue_size() {
        let state = test_state();
        router(state.clone())
            .oneshot(post_event(r#"{"summary":"a"}"#))
            .await
            .unwrap();

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = router(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"status": "ok", "queue_size": 1, "dispatcher": "idle"})
        );
    }
}
