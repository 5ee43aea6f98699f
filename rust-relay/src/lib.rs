//! pd-relay - rate-limited relay for PagerDuty Events API v2.
//!
//! Events posted to the ingress are queued in memory and forwarded by a
//! single dispatcher that never exceeds the per-routing-key quota of the
//! Events API. Deliveries that get no JSON answer go back to the tail of
//! the queue.
//!
//! ## Architecture
//!
//! ```text
//! POST / → Ingress → DeliveryQueue → Dispatcher (RateLimiter) → Events API
//! ```

pub mod bootstrap;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod queue;
pub mod ratelimit;
pub mod relay;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use dispatch::{DispatchStats, Dispatcher, DispatcherState, EventsClient};
pub use error::{DeliveryError, StartupError};
pub use queue::{DeliveryQueue, EventPayload, RoutingKey};
pub use ratelimit::RateLimiter;
pub use relay::{DispatcherHandle, Relay};
pub use web::AppState;
