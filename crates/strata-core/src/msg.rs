//! Decoded message-bus event.

use serde_json::Value;

/// One event pulled off the message bus, decoded to JSON.
#[derive(Debug, Clone)]
pub struct BusMessage {
    /// Topic the event arrived on.
    pub topic: String,

    /// Message key; carries the job ID on new-job events.
    pub key: Option<String>,

    /// Decoded JSON payload.
    pub value: Value,

    /// Broker timestamp in milliseconds, when available.
    pub timestamp_ms: Option<i64>,
}

impl BusMessage {
    /// Creates a message.
    #[must_use]
    pub fn new(topic: impl Into<String>, key: Option<String>, value: Value) -> Self {
        Self {
            topic: topic.into(),
            key,
            value,
            timestamp_ms: None,
        }
    }
}
