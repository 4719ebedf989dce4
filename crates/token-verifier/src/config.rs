//! Token verifier configuration.
//!
//! Configuration is loaded from environment variables. The SASL password is
//! held as a [`SecretString`] and redacted in Debug output.

use crate::cache::DEFAULT_KEY_CACHE_CAPACITY;
use crate::feed::DEFAULT_MAX_DRAIN_RECORDS;
use crate::resolver::DEFAULT_DRAIN_TIMEOUT;
use crate::token::MAX_TOKEN_SIZE_BYTES;
use secrecy::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default Kafka bootstrap servers.
pub const DEFAULT_BOOTSTRAP_SERVERS: &str = "localhost:9092";

/// Default topic carrying key id to public key records.
pub const DEFAULT_KEY_FEED_TOPIC: &str = "token-verifier-keys";

/// Prefix for generated consumer group ids.
pub const DEFAULT_GROUP_ID_PREFIX: &str = "token-verifier";

/// Upper bound for `KEY_CACHE_CAPACITY`.
pub const MAX_KEY_CACHE_CAPACITY: usize = 1_000_000;

/// Upper bound for `KEY_FEED_MAX_RECORDS`.
pub const MAX_DRAIN_RECORDS_LIMIT: usize = 100_000;

/// Upper bound for `KEY_DRAIN_TIMEOUT_MS`.
pub const MAX_DRAIN_TIMEOUT_MS: u64 = 60_000;

/// Upper bound for `MAX_TOKEN_SIZE_BYTES`.
pub const MAX_TOKEN_SIZE_LIMIT: usize = 65_536;

/// Where a fresh consumer group starts reading the key topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetReset {
    /// Replay the whole retained topic.
    Earliest,
    /// Only records published after the consumer joins.
    Latest,
}

impl OffsetReset {
    /// Value for librdkafka's `auto.offset.reset`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OffsetReset::Earliest => "earliest",
            OffsetReset::Latest => "latest",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

/// Kafka connection settings for the key feed.
#[derive(Clone)]
pub struct KafkaFeedConfig {
    /// Comma-separated broker list.
    pub bootstrap_servers: String,

    /// Topic carrying key records.
    pub topic: String,

    /// Consumer group id. Unique per process by default so every verifier
    /// instance sees every key.
    pub group_id: String,

    /// Starting position for the fresh consumer group.
    pub offset_reset: OffsetReset,

    /// Most records returned by a single drain.
    pub max_records_per_drain: usize,

    /// Optional SASL/PLAIN username.
    pub sasl_username: Option<String>,

    /// Optional SASL/PLAIN password.
    pub sasl_password: Option<SecretString>,
}

impl fmt::Debug for KafkaFeedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KafkaFeedConfig")
            .field("bootstrap_servers", &self.bootstrap_servers)
            .field("topic", &self.topic)
            .field("group_id", &self.group_id)
            .field("offset_reset", &self.offset_reset)
            .field("max_records_per_drain", &self.max_records_per_drain)
            .field("sasl_username", &self.sasl_username)
            .field(
                "sasl_password",
                &self.sasl_password.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Token verifier configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Key feed connection.
    pub kafka: KafkaFeedConfig,

    /// Maximum number of cached keys.
    pub key_cache_capacity: usize,

    /// Upper bound on a single feed drain.
    pub drain_timeout: Duration,

    /// Tokens longer than this are rejected.
    pub max_token_size: usize,

    /// Log output format.
    pub log_format: LogFormat,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid offset reset configuration: {0}")]
    InvalidOffsetReset(String),

    #[error("Invalid max records per drain configuration: {0}")]
    InvalidMaxRecords(String),

    #[error("Invalid key cache capacity configuration: {0}")]
    InvalidCacheCapacity(String),

    #[error("Invalid drain timeout configuration: {0}")]
    InvalidDrainTimeout(String),

    #[error("Invalid max token size configuration: {0}")]
    InvalidMaxTokenSize(String),

    #[error("Invalid log format configuration: {0}")]
    InvalidLogFormat(String),

    #[error("Invalid SASL configuration: {0}")]
    InvalidSasl(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bootstrap_servers = vars
            .get("KAFKA_BOOTSTRAP_SERVERS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BOOTSTRAP_SERVERS.to_string());

        let topic = vars
            .get("KEY_FEED_TOPIC")
            .cloned()
            .unwrap_or_else(|| DEFAULT_KEY_FEED_TOPIC.to_string());

        let group_id = vars.get("KEY_FEED_GROUP_ID").cloned().unwrap_or_else(|| {
            format!("{}-{}", DEFAULT_GROUP_ID_PREFIX, uuid::Uuid::new_v4())
        });

        let offset_reset = match vars.get("KEY_FEED_OFFSET_RESET").map(String::as_str) {
            None | Some("earliest") => OffsetReset::Earliest,
            Some("latest") => OffsetReset::Latest,
            Some(other) => {
                return Err(ConfigError::InvalidOffsetReset(format!(
                    "KEY_FEED_OFFSET_RESET must be 'earliest' or 'latest', got '{}'",
                    other
                )))
            }
        };

        let sasl_username = vars.get("KEY_FEED_SASL_USERNAME").cloned();
        let sasl_password = vars
            .get("KEY_FEED_SASL_PASSWORD")
            .map(|p| SecretString::from(p.clone()));
        if sasl_username.is_some() != sasl_password.is_some() {
            return Err(ConfigError::InvalidSasl(
                "KEY_FEED_SASL_USERNAME and KEY_FEED_SASL_PASSWORD must be set together"
                    .to_string(),
            ));
        }

        let max_records_per_drain = if let Some(value_str) = vars.get("KEY_FEED_MAX_RECORDS") {
            let value: usize = value_str.parse().map_err(|e| {
                ConfigError::InvalidMaxRecords(format!(
                    "KEY_FEED_MAX_RECORDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 || value > MAX_DRAIN_RECORDS_LIMIT {
                return Err(ConfigError::InvalidMaxRecords(format!(
                    "KEY_FEED_MAX_RECORDS must be between 1 and {}, got {}",
                    MAX_DRAIN_RECORDS_LIMIT, value
                )));
            }

            value
        } else {
            DEFAULT_MAX_DRAIN_RECORDS
        };

        let key_cache_capacity = if let Some(value_str) = vars.get("KEY_CACHE_CAPACITY") {
            let value: usize = value_str.parse().map_err(|e| {
                ConfigError::InvalidCacheCapacity(format!(
                    "KEY_CACHE_CAPACITY must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 || value > MAX_KEY_CACHE_CAPACITY {
                return Err(ConfigError::InvalidCacheCapacity(format!(
                    "KEY_CACHE_CAPACITY must be between 1 and {}, got {}",
                    MAX_KEY_CACHE_CAPACITY, value
                )));
            }

            value
        } else {
            DEFAULT_KEY_CACHE_CAPACITY
        };

        let drain_timeout = if let Some(value_str) = vars.get("KEY_DRAIN_TIMEOUT_MS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidDrainTimeout(format!(
                    "KEY_DRAIN_TIMEOUT_MS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 || value > MAX_DRAIN_TIMEOUT_MS {
                return Err(ConfigError::InvalidDrainTimeout(format!(
                    "KEY_DRAIN_TIMEOUT_MS must be between 1 and {}, got {}",
                    MAX_DRAIN_TIMEOUT_MS, value
                )));
            }

            Duration::from_millis(value)
        } else {
            DEFAULT_DRAIN_TIMEOUT
        };

        let max_token_size = if let Some(value_str) = vars.get("MAX_TOKEN_SIZE_BYTES") {
            let value: usize = value_str.parse().map_err(|e| {
                ConfigError::InvalidMaxTokenSize(format!(
                    "MAX_TOKEN_SIZE_BYTES must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 || value > MAX_TOKEN_SIZE_LIMIT {
                return Err(ConfigError::InvalidMaxTokenSize(format!(
                    "MAX_TOKEN_SIZE_BYTES must be between 1 and {}, got {}",
                    MAX_TOKEN_SIZE_LIMIT, value
                )));
            }

            value
        } else {
            MAX_TOKEN_SIZE_BYTES
        };

        let log_format = match vars.get("LOG_FORMAT").map(String::as_str) {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidLogFormat(format!(
                    "LOG_FORMAT must be 'text' or 'json', got '{}'",
                    other
                )))
            }
        };

        Ok(Config {
            kafka: KafkaFeedConfig {
                bootstrap_servers,
                topic,
                group_id,
                offset_reset,
                max_records_per_drain,
                sasl_username,
                sasl_password,
            },
            key_cache_capacity,
            drain_timeout,
            max_token_size,
            log_format,
        })
    }
}
