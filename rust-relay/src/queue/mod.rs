//! Queue module for pending event deliveries.
//!
//! This module provides:
//! - The event payload type accepted by the ingress
//! - The in-memory delivery queue drained by the dispatcher
//!
//! ## Architecture
//!
//! ```text
//! Ingress → DeliveryQueue → Dispatcher → Events API
//!               ↑                 │
//!               └── re-queue ─────┘
//! ```

pub mod delivery;
pub mod types;

pub use delivery::DeliveryQueue;
pub use types::{EventPayload, RoutingKey, ROUTING_KEY_FIELD};
