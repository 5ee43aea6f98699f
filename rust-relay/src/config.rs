//! Configuration module for environment variable parsing.
//!
//! Every setting has a default so a bare `docker run` with only the routing
//! keys file mounted behaves like the production deployment.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;
use url::Url;

/// PagerDuty Events API v2 enqueue endpoint.
pub const PD_EVENTS_API: &str = "https://events.pagerduty.com/v2/enqueue";

/// Calls per window allowed by the Events API for a single routing key.
pub const PD_RATE_LIMIT_CALLS_PER_MINUTE: usize = 120;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the ingress server to listen on
    pub port: u16,

    /// Downstream events endpoint
    pub events_api: Url,

    /// Maximum delivery attempts started per rate window
    pub rate_limit_calls: usize,

    /// Length of the rolling rate window
    pub rate_limit_window: Duration,

    /// Outbound HTTP request timeout in milliseconds
    pub request_timeout_ms: u64,

    // =========================================================================
    // Bootstrap Configuration
    // =========================================================================
    /// CSV file of pre-provisioned routing keys (first column)
    pub routing_keys_file: PathBuf,

    /// Container hostname, used to look this container up in the Docker API
    pub hostname: Option<String>,

    /// Explicit 1-based routing key index, skips Docker discovery when set
    pub container_index: Option<usize>,

    /// Docker Engine API unix socket
    pub docker_socket: PathBuf,

    /// Container name prefix preceding the replica index
    pub container_name_prefix: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let events_api = match env::var("PD_EVENTS_API") {
            Ok(raw) => Url::parse(&raw).unwrap_or_else(|e| {
                warn!(env_var = "PD_EVENTS_API", value = %raw, error = %e, "Invalid URL, using default");
                default_events_api()
            }),
            Err(_) => default_events_api(),
        };

        Config {
            port: parse_or("PORT", 5000),

            events_api,

            rate_limit_calls: parse_nonzero_or("PD_RATE_LIMIT_CALLS", PD_RATE_LIMIT_CALLS_PER_MINUTE),

            rate_limit_window: Duration::from_secs(parse_nonzero_or("PD_RATE_LIMIT_WINDOW_SECS", 60)),

            request_timeout_ms: parse_or("REQUEST_TIMEOUT_MS", 10_000),

            routing_keys_file: env::var("ROUTING_KEYS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("pd_routing_keys.txt")),

            hostname: env::var("HOSTNAME").ok().filter(|h| !h.is_empty()),

            container_index: env::var("CONTAINER_INDEX")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .filter(|idx: &usize| *idx > 0),

            docker_socket: env::var("DOCKER_SOCKET")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/run/docker.sock")),

            container_name_prefix: env::var("CONTAINER_NAME_PREFIX")
                .unwrap_or_else(|_| "/pd-event-handler_flask_".to_string()),
        }
    }

    /// Outbound request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
impl Config {
    /// Configuration pointing at a test endpoint, with Docker discovery off.
    pub(crate) fn for_tests(events_api: Url) -> Self {
        Config {
            port: 0,
            events_api,
            rate_limit_calls: PD_RATE_LIMIT_CALLS_PER_MINUTE,
            rate_limit_window: Duration::from_secs(60),
            request_timeout_ms: 2_000,
            routing_keys_file: PathBuf::from("pd_routing_keys.txt"),
            hostname: None,
            container_index: None,
            docker_socket: PathBuf::from("/nonexistent/docker.sock"),
            container_name_prefix: "/pd-event-handler_flask_".to_string(),
        }
    }
}

fn default_events_api() -> Url {
    Url::parse(PD_EVENTS_API).expect("PD_EVENTS_API constant is a valid URL")
}

/// Parse an environment variable, warning and falling back on bad values.
fn parse_or<T: FromStr + Copy>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

/// Like [`parse_or`], but zero also falls back to the default.
fn parse_nonzero_or<T: FromStr + Copy + Default + PartialEq>(name: &str, default: T) -> T {
    let value = parse_or(name, default);
    if value == T::default() {
        warn!(env_var = name, "Zero is not allowed, using default");
        default
    } else {
        value
    }
}
