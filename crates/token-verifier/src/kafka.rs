//! Kafka-backed key feed.
//!
//! Each record on the key topic maps a key id (record key, UTF-8) to an RSA
//! public key (record value, base64 SPKI). The consumer never commits
//! offsets: all state lives in the local cache, and a fresh group id per
//! process makes every verifier instance read the topic independently.
//!
//! `BaseConsumer` is not meant to be polled from several threads at once.
//! [`KafkaKeyFeed`] is therefore only ever driven through
//! [`KeyFeedReader`](crate::feed::KeyFeedReader).

use crate::config::KafkaFeedConfig;
use crate::error::FeedError;
use crate::feed::{FeedRecord, KeyFeed};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::message::{BorrowedMessage, Message};
use secrecy::ExposeSecret;
use std::time::{Duration, Instant};

/// Key feed reading a Kafka topic through a `BaseConsumer`.
pub struct KafkaKeyFeed {
    consumer: BaseConsumer,
    topic: String,
    max_records: usize,
}

impl KafkaKeyFeed {
    /// Create a consumer and subscribe it to the key topic.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::Unavailable` if the client cannot be created or the
    /// subscription fails.
    pub fn new(config: &KafkaFeedConfig) -> Result<Self, FeedError> {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", &config.bootstrap_servers)
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", "false")
            .set("enable.auto.offset.store", "false")
            .set("auto.offset.reset", config.offset_reset.as_str())
            .set("session.timeout.ms", "30000");

        if let (Some(username), Some(password)) = (&config.sasl_username, &config.sasl_password) {
            client_config
                .set("security.protocol", "SASL_SSL")
                .set("sasl.mechanism", "PLAIN")
                .set("sasl.username", username)
                .set("sasl.password", password.expose_secret());
        }

        let consumer: BaseConsumer = client_config.create().map_err(|e| {
            tracing::error!(target: "verifier.kafka", error = %e, "Failed to create Kafka consumer");
            FeedError::Unavailable(e.to_string())
        })?;

        consumer.subscribe(&[config.topic.as_str()]).map_err(|e| {
            tracing::error!(
                target: "verifier.kafka",
                topic = %config.topic,
                error = %e,
                "Failed to subscribe to key topic"
            );
            FeedError::Unavailable(e.to_string())
        })?;

        tracing::info!(
            target: "verifier.kafka",
            topic = %config.topic,
            group_id = %config.group_id,
            offset_reset = config.offset_reset.as_str(),
            max_records_per_drain = config.max_records_per_drain,
            "Subscribed to key topic"
        );

        Ok(Self {
            consumer,
            topic: config.topic.clone(),
            max_records: config.max_records_per_drain.max(1),
        })
    }
}

impl KeyFeed for KafkaKeyFeed {
    fn drain(&mut self, max_wait: Duration) -> Result<Vec<FeedRecord>, FeedError> {
        let deadline = Instant::now() + max_wait;
        let mut records = Vec::new();

        // Wait for the first message, then take whatever is already buffered,
        // stopping at the deadline or the record cap
        loop {
            let timeout = if records.is_empty() {
                deadline.saturating_duration_since(Instant::now())
            } else {
                Duration::ZERO
            };

            match self.consumer.poll(timeout) {
                Some(Ok(message)) => {
                    if let Some(record) = to_record(&message) {
                        records.push(record);
                    }
                }
                Some(Err(e)) => {
                    if records.is_empty() {
                        tracing::warn!(
                            target: "verifier.kafka",
                            topic = %self.topic,
                            error = %e,
                            "Key topic poll failed"
                        );
                        return Err(FeedError::Unavailable(e.to_string()));
                    }
                    // Records already consumed must not be lost
                    tracing::warn!(
                        target: "verifier.kafka",
                        error = %e,
                        record_count = records.len(),
                        "Key topic poll failed mid-drain, returning partial batch"
                    );
                    break;
                }
                None => {
                    if !records.is_empty() {
                        break;
                    }
                }
            }

            if records.len() >= self.max_records || Instant::now() >= deadline {
                break;
            }
        }

        tracing::debug!(
            target: "verifier.kafka",
            record_count = records.len(),
            "Drained key topic"
        );

        Ok(records)
    }
}

/// Convert a message into a feed record, skipping unusable ones.
fn to_record(message: &BorrowedMessage<'_>) -> Option<FeedRecord> {
    let Some(key) = message.key() else {
        tracing::warn!(
            target: "verifier.kafka",
            partition = message.partition(),
            offset = message.offset(),
            "Skipping key record without a key id"
        );
        return None;
    };

    let Ok(key_id) = std::str::from_utf8(key) else {
        tracing::warn!(
            target: "verifier.kafka",
            partition = message.partition(),
            offset = message.offset(),
            "Skipping key record with non-UTF-8 key id"
        );
        return None;
    };

    Some(FeedRecord::new(key_id, message.payload().unwrap_or_default()))
}
