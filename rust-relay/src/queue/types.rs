//! Event payload and routing key types carried through the delivery queue.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved payload field holding the destination routing key.
pub const ROUTING_KEY_FIELD: &str = "routing_key";

/// An inbound event as accepted by the ingress.
///
/// The relay treats the body as opaque apart from `routing_key`, which is
/// always overwritten with this instance's key before sending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventPayload(Map<String, Value>);

impl EventPayload {
    /// Parse a raw request body. Only JSON objects are accepted.
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }

    /// Overwrite the reserved `routing_key` field.
    pub fn set_routing_key(&mut self, routing_key: &str) {
        self.0.insert(
            ROUTING_KEY_FIELD.to_string(),
            Value::String(routing_key.to_string()),
        );
    }

    /// Look up a top-level field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// `event_action` of the payload, when present, for log context.
    pub fn event_action(&self) -> Option<&str> {
        self.0.get("event_action").and_then(Value::as_str)
    }

    /// `dedup_key` of the payload, when present, for log context.
    pub fn dedup_key(&self) -> Option<&str> {
        self.0.get("dedup_key").and_then(Value::as_str)
    }
}

/// Routing key identifying the PagerDuty service events are delivered to.
///
/// Set once at startup and shared read-only afterwards. Not
/// `Display`, so it only reaches logs through [`RoutingKey::redacted`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingKey(Arc<str>);

impl RoutingKey {
    /// Build a routing key, rejecting blank values.
    pub fn new(key: &str) -> Option<Self> {
        let key = key.trim();
        if key.is_empty() {
            None
        } else {
            Some(Self(Arc::from(key)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First four characters followed by a mask, for logging.
    pub fn redacted(&self) -> String {
        let visible: String = self.0.chars().take(4).collect();
        format!("{visible}****")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_slice_object() {
        let payload =
            EventPayload::from_slice(br#"{"event_action":"trigger","summary":"disk full"}"#)
                .unwrap();
        assert_eq!(payload.event_action(), Some("trigger"));
        assert_eq!(payload.get("summary"), Some(&json!("disk full")));
        assert_eq!(payload.dedup_key(), None);
    }

    #[test]
    fn test_from_slice_rejects_non_object() {
        assert!(EventPayload::from_slice(b"[1, 2, 3]").is_err());
        assert!(EventPayload::from_slice(b"\"trigger\"").is_err());
        assert!(EventPayload::from_slice(b"{not json").is_err());
    }

    #[test]
    fn test_set_routing_key_overwrites_caller_value() {
        let mut payload =
            EventPayload::from_slice(br#"{"routing_key":"spoofed","summary":"x"}"#).unwrap();
        payload.set_routing_key("R0UT1NGKEY");

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json, json!({"routing_key": "R0UT1NGKEY", "summary": "x"}));
    }

    #[test]
    fn test_routing_key_rejects_blank() {
        assert!(RoutingKey::new("").is_none());
        assert!(RoutingKey::new("   ").is_none());
        assert_eq!(RoutingKey::new(" abc \n").unwrap().as_str(), "abc");
    }

    #[test]
    fn test_routing_key_redacted() {
        let key = RoutingKey::new("R0UT1NGKEY").unwrap();
        assert_eq!(key.redacted(), "R0UT****");
        assert_eq!(RoutingKey::new("ab").unwrap().redacted(), "ab****");
    }
}
