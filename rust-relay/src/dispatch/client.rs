//! HTTP client for the PagerDuty Events API.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::DeliveryError;
use crate::queue::{EventPayload, RoutingKey};

/// Dedup key used by the startup verification event.
pub const VERIFY_DEDUP_KEY: &str = "pd_event_handler";

/// Longest response body kept in error previews.
const BODY_PREVIEW_LEN: usize = 500;

/// Parsed response to a delivered event.
#[derive(Debug, Clone)]
pub struct DeliveryResponse {
    pub status_code: u16,
    pub body: Value,
}

impl DeliveryResponse {
    /// Whether the API reported a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

#[derive(Serialize)]
struct ResolveProbe<'a> {
    routing_key: &'a str,
    dedup_key: &'a str,
    event_action: &'a str,
}

/// Events API client bound to a single endpoint.
#[derive(Debug, Clone)]
pub struct EventsClient {
    http: Client,
    endpoint: Url,
}

impl EventsClient {
    /// Create a client posting to `endpoint` with the given request timeout.
    pub fn new(endpoint: Url, timeout: Duration) -> reqwest::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, endpoint })
    }

    /// Endpoint this client posts to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// POST an event and parse the response body as JSON.
    ///
    /// Any JSON body counts as a response, whatever the status code; only a
    /// transport failure or a non-JSON body is an error.
    pub async fn send_event(
        &self,
        payload: &EventPayload,
    ) -> Result<DeliveryResponse, DeliveryError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(payload)
            .send()
            .await?;

        let status_code = response.status().as_u16();
        let body = response.text().await?;

        debug!(
            status_code = status_code,
            body_length = body.len(),
            "events_api_response"
        );

        match serde_json::from_str(&body) {
            Ok(body) => Ok(DeliveryResponse { status_code, body }),
            Err(_) => Err(DeliveryError::MalformedResponse {
                status_code,
                body_preview: preview(&body),
            }),
        }
    }

    /// Send a resolve event for a dedup key nothing else uses.
    ///
    /// The API answers 202 only for a valid routing key, which makes this a
    /// side-effect-free credential check.
    pub async fn send_resolve_probe(&self, routing_key: &RoutingKey) -> reqwest::Result<StatusCode> {
        let probe = ResolveProbe {
            routing_key: routing_key.as_str(),
            dedup_key: VERIFY_DEDUP_KEY,
            event_action: "resolve",
        };

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&probe)
            .send()
            .await?;

        Ok(response.status())
    }
}

fn preview(body: &str) -> String {
    match body.char_indices().nth(BODY_PREVIEW_LEN) {
        Some((end, _)) => body[..end].to_string(),
        None => body.to_string(),
    }
}
