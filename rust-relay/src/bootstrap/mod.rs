//! Startup: decide which routing key this replica uses and prove it works.
//!
//! ```text
//! container index → routing keys file → resolve probe (202) → RoutingKey
//! ```
//!
//! Any failure here is fatal; the ingress never binds without a verified key.

pub mod container;
pub mod keys;

use reqwest::StatusCode;
use tracing::{error, info};

use crate::config::Config;
use crate::dispatch::EventsClient;
use crate::error::StartupError;
use crate::queue::RoutingKey;

pub use container::container_index;
pub use keys::{load_routing_keys, select_routing_key};

/// Resolve and verify this replica's routing key.
pub async fn resolve_routing_key(
    config: &Config,
    client: &EventsClient,
) -> Result<RoutingKey, StartupError> {
    let index = container_index(config).await;
    let keys = load_routing_keys(&config.routing_keys_file).await?;

    let routing_key = select_routing_key(&keys, index).inspect_err(|e| {
        error!(error = %e, container_index = index, "Routing key unavailable - terminating server");
    })?;

    info!(
        routing_key = %routing_key.redacted(),
        container_index = index,
        keys_available = keys.len(),
        "routing_key_assigned"
    );

    verify_routing_key(client, &routing_key).await?;

    Ok(routing_key)
}

/// Send a dummy resolve event and require a 202.
pub async fn verify_routing_key(
    client: &EventsClient,
    routing_key: &RoutingKey,
) -> Result<(), StartupError> {
    let status = client
        .send_resolve_probe(routing_key)
        .await
        .map_err(StartupError::Verification)?;

    if status != StatusCode::ACCEPTED {
        error!(
            status_code = status.as_u16(),
            routing_key = %routing_key.redacted(),
            "Invalid routing key provided - terminating server"
        );
        return Err(StartupError::KeyRejected {
            status_code: status.as_u16(),
        });
    }

    info!(routing_key = %routing_key.redacted(), "routing_key_verified");
    Ok(())
}
