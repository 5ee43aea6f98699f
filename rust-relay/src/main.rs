//! pd-relay - PagerDuty event relay.
//!
//! This binary:
//! 1. Resolves and verifies the routing key for this replica
//! 2. Starts the rate-limited dispatcher
//! 3. Serves the ingress until SIGINT/SIGTERM
//!
//! A routing key that cannot be resolved or verified exits non-zero before
//! anything binds.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pdrelay::{bootstrap, Config, EventsClient, RateLimiter, Relay};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("relay_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        events_api = %config.events_api,
        rate_limit_calls = config.rate_limit_calls,
        rate_limit_window_secs = config.rate_limit_window.as_secs(),
        routing_keys_file = %config.routing_keys_file.display(),
        "config_loaded"
    );

    let client = EventsClient::new(config.events_api.clone(), config.request_timeout())
        .context("Failed to create HTTP client")?;

    // Fatal on failure: nothing is served without a verified key
    let routing_key = bootstrap::resolve_routing_key(&config, &client)
        .await
        .context("Routing key resolution failed")?;

    let relay = Relay::new(routing_key);

    let limiter = RateLimiter::new(config.rate_limit_calls, config.rate_limit_window);
    let dispatcher = relay.spawn_dispatcher(client, limiter, CancellationToken::new());

    let app = relay
        .router(dispatcher.state())
        .layer(TraceLayer::new_for_http());

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "relay_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    let stats = dispatcher.stop().await;

    info!(
        attempts = stats.attempts,
        delivered = stats.delivered,
        requeued = stats.requeued,
        dropped = relay.queue().size(),
        "relay_shutdown_complete"
    );

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("relay_shutting_down");
}
