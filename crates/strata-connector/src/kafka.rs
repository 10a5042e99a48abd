//! Kafka intake.

use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::Message;
use rdkafka::ClientConfig;
use strata_config::KafkaSettings;
use strata_core::{BusMessage, StrataError, StrataResult};
use tracing::{info, warn};

/// Wraps a Kafka stream consumer subscribed to the scheduler's two topics.
pub struct BusConsumer {
    consumer: StreamConsumer,
    topics: Vec<String>,
}

impl BusConsumer {
    /// Creates the consumer from the Kafka settings. Does not subscribe
    /// yet; call [`BusConsumer::subscribe`] before polling.
    pub fn from_config(settings: &KafkaSettings) -> StrataResult<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &settings.kafka_brokers)
            .set("group.id", &settings.kafka_group_id)
            .set(
                "session.timeout.ms",
                settings.kafka_session_timeout_ms.to_string(),
            )
            .set("auto.offset.reset", "earliest")
            .create()
            .map_err(|e| StrataError::Bus(e.to_string()))?;

        Ok(Self {
            consumer,
            topics: vec![
                settings.topic_new_job_notify.clone(),
                settings.topic_job_complete_notify.clone(),
            ],
        })
    }

    /// Subscribes to the configured topics.
    pub fn subscribe(&self) -> StrataResult<()> {
        let topics: Vec<&str> = self.topics.iter().map(String::as_str).collect();
        self.consumer
            .subscribe(&topics)
            .map_err(|e| StrataError::Bus(e.to_string()))?;

        info!(topics = ?self.topics, "Monitor topics");
        Ok(())
    }

    /// Awaits the next decodable message.
    ///
    /// Returns `Ok(None)` for messages that are skipped (blank or
    /// undecodable payloads, partition-EOF events); those are logged and
    /// never stop the consumer. Broker-level errors come back as
    /// [`StrataError::Bus`].
    pub async fn next_message(&self) -> StrataResult<Option<BusMessage>> {
        match self.consumer.recv().await {
            Ok(record) => {
                let key = record.key().and_then(decode_utf8);
                let payload = record.payload();
                Ok(decode_event(
                    record.topic(),
                    key,
                    payload,
                    record.timestamp().to_millis(),
                ))
            }
            Err(KafkaError::PartitionEOF(partition)) => {
                warn!(partition, "Reached end of partition");
                Ok(None)
            }
            Err(e) => Err(StrataError::Bus(e.to_string())),
        }
    }
}

fn decode_utf8(data: &[u8]) -> Option<String> {
    match std::str::from_utf8(data) {
        Ok(text) => Some(text.to_string()),
        Err(e) => {
            warn!(error = %e, "Skipping non-UTF-8 message key");
            None
        }
    }
}

/// Decodes one record into a [`BusMessage`]; `None` skips it.
fn decode_event(
    topic: &str,
    key: Option<String>,
    payload: Option<&[u8]>,
    timestamp_ms: Option<i64>,
) -> Option<BusMessage> {
    let Some(payload) = payload.filter(|bytes| !bytes.is_empty()) else {
        warn!(topic, "Skipping blank message");
        return None;
    };

    match serde_json::from_slice(payload) {
        Ok(value) => {
            let mut msg = BusMessage::new(topic, key, value);
            msg.timestamp_ms = timestamp_ms;
            Some(msg)
        }
        Err(e) => {
            warn!(topic, error = %e, "Skipping undecodable message payload");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_event() {
        let payload = br#"{ "cpu": 1, "mem": 2 }"#;
        let msg = decode_event(
            "job_finish",
            Some("key-1".to_string()),
            Some(payload),
            Some(1_554_436_613_182),
        )
        .unwrap();

        assert_eq!(msg.topic, "job_finish");
        assert_eq!(msg.key.as_deref(), Some("key-1"));
        assert_eq!(msg.value, json!({ "cpu": 1, "mem": 2 }));
        assert_eq!(msg.timestamp_ms, Some(1_554_436_613_182));
    }

    #[test]
    fn test_blank_and_garbage_payloads_are_skipped() {
        assert!(decode_event("new_job", None, None, None).is_none());
        assert!(decode_event("new_job", None, Some(b""), None).is_none());
        assert!(decode_event("new_job", None, Some(b"not json"), None).is_none());
    }
}
