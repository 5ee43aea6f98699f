//! Outbound delivery: the Events API client and the rate-limited dispatcher.
//!
//! ```text
//! DeliveryQueue.pop → RateLimiter.acquire → EventsClient.send_event
//!        ↑                                          │
//!        └────────── push (non-JSON / transport) ───┘
//! ```

pub mod client;
pub mod dispatcher;

pub use client::{DeliveryResponse, EventsClient, VERIFY_DEDUP_KEY};
pub use dispatcher::{AttemptOutcome, DispatchStats, Dispatcher, DispatcherState};
