// Configuration module for kafka_sessions
//
// Settings come from environment variables, fall back to the defaults in
// `kafka::constants`, and are validated once at startup.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::kafka::constants::{
    DEFAULT_BROKERS, DEFAULT_CLIENT_ID, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_GROUP_ID,
    DEFAULT_LOG_FORMAT, DEFAULT_MESSAGE_TIMEOUT_MS, DEFAULT_OPERATION_TIMEOUT_MS,
    DEFAULT_PROBE_TIMEOUT_MS, DEFAULT_REPLICATION_FACTOR, DEFAULT_TOPIC_PARTITIONS, ENV_BROKERS,
    ENV_CLIENT_ID, ENV_CONNECT_TIMEOUT_MS, ENV_GROUP_ID, ENV_LOG_FORMAT, ENV_MESSAGE_TIMEOUT_MS,
    ENV_OPERATION_TIMEOUT_MS, ENV_PROBE_TIMEOUT_MS, ENV_REPLICATION_FACTOR, ENV_TOPIC_PARTITIONS,
    MAX_TIMEOUT_MS, MIN_TIMEOUT_MS,
};
use crate::kafka::error::{Result, SessionError};

/// Log output format for the binary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(SessionError::InvalidConfig(format!(
                "{} must be 'pretty' or 'json', got '{}'",
                ENV_LOG_FORMAT, other
            ))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => f.write_str("pretty"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

/// Configuration struct holding all broker session settings
///
/// The broker endpoint (brokers, client id, group id) is immutable after
/// startup and shared read-only by every component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Bootstrap broker list (e.g., "kafka1:9092,kafka2:9092")
    pub brokers: String,
    /// Client identity reported to the broker
    pub client_id: String,
    /// Consumer group identity shared by every consumption activity
    pub group_id: String,
    /// Partition count for newly created topics
    pub default_partitions: i32,
    /// Replication factor for newly created topics
    pub replication_factor: i32,
    /// Metadata fetch timeout used to prove a session is connected
    pub connect_timeout_ms: u64,
    /// Broker-side timeout for create/delete requests
    pub operation_timeout_ms: u64,
    /// Delivery timeout for a published message
    pub message_timeout_ms: u64,
    /// Upper bound on a whole availability probe
    pub probe_timeout_ms: u64,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            brokers: DEFAULT_BROKERS.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            group_id: DEFAULT_GROUP_ID.to_string(),
            default_partitions: DEFAULT_TOPIC_PARTITIONS,
            replication_factor: DEFAULT_REPLICATION_FACTOR,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
            message_timeout_ms: DEFAULT_MESSAGE_TIMEOUT_MS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    ///
    /// Unset and blank variables fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Config {
            brokers: get(ENV_BROKERS).unwrap_or_else(|| DEFAULT_BROKERS.to_string()),
            client_id: get(ENV_CLIENT_ID).unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string()),
            group_id: get(ENV_GROUP_ID).unwrap_or_else(|| DEFAULT_GROUP_ID.to_string()),
            default_partitions: parse_or(
                ENV_TOPIC_PARTITIONS,
                get(ENV_TOPIC_PARTITIONS),
                DEFAULT_TOPIC_PARTITIONS,
            )?,
            replication_factor: parse_or(
                ENV_REPLICATION_FACTOR,
                get(ENV_REPLICATION_FACTOR),
                DEFAULT_REPLICATION_FACTOR,
            )?,
            connect_timeout_ms: parse_or(
                ENV_CONNECT_TIMEOUT_MS,
                get(ENV_CONNECT_TIMEOUT_MS),
                DEFAULT_CONNECT_TIMEOUT_MS,
            )?,
            operation_timeout_ms: parse_or(
                ENV_OPERATION_TIMEOUT_MS,
                get(ENV_OPERATION_TIMEOUT_MS),
                DEFAULT_OPERATION_TIMEOUT_MS,
            )?,
            message_timeout_ms: parse_or(
                ENV_MESSAGE_TIMEOUT_MS,
                get(ENV_MESSAGE_TIMEOUT_MS),
                DEFAULT_MESSAGE_TIMEOUT_MS,
            )?,
            probe_timeout_ms: parse_or(
                ENV_PROBE_TIMEOUT_MS,
                get(ENV_PROBE_TIMEOUT_MS),
                DEFAULT_PROBE_TIMEOUT_MS,
            )?,
            log_format: get(ENV_LOG_FORMAT)
                .as_deref()
                .unwrap_or(DEFAULT_LOG_FORMAT)
                .parse()?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check every value against its accepted range
    pub fn validate(&self) -> Result<()> {
        if self.brokers.split(',').all(|b| b.trim().is_empty()) {
            return Err(invalid(ENV_BROKERS, "must list at least one broker"));
        }
        if self.client_id.trim().is_empty() {
            return Err(invalid(ENV_CLIENT_ID, "must not be empty"));
        }
        if self.group_id.trim().is_empty() {
            return Err(invalid(ENV_GROUP_ID, "must not be empty"));
        }
        if self.default_partitions < 1 {
            return Err(invalid(ENV_TOPIC_PARTITIONS, "must be at least 1"));
        }
        if self.replication_factor < 1 {
            return Err(invalid(ENV_REPLICATION_FACTOR, "must be at least 1"));
        }

        for (key, value) in [
            (ENV_CONNECT_TIMEOUT_MS, self.connect_timeout_ms),
            (ENV_OPERATION_TIMEOUT_MS, self.operation_timeout_ms),
            (ENV_MESSAGE_TIMEOUT_MS, self.message_timeout_ms),
            (ENV_PROBE_TIMEOUT_MS, self.probe_timeout_ms),
        ] {
            if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&value) {
                return Err(invalid(
                    key,
                    &format!(
                        "must be between {} and {} ms, got {}",
                        MIN_TIMEOUT_MS, MAX_TIMEOUT_MS, value
                    ),
                ));
            }
        }

        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn message_timeout(&self) -> Duration {
        Duration::from_millis(self.message_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

fn invalid(key: &str, reason: &str) -> SessionError {
    SessionError::InvalidConfig(format!("{} {}", key, reason))
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| invalid(key, &format!("is not a valid number: '{}'", raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.brokers, "localhost:9092");
        assert_eq!(config.client_id, "my-app");
        assert_eq!(config.group_id, "test-group");
        assert_eq!(config.default_partitions, 2);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            (ENV_BROKERS, "k1:9092,k2:9092"),
            (ENV_GROUP_ID, "billing"),
            (ENV_TOPIC_PARTITIONS, "6"),
            (ENV_PROBE_TIMEOUT_MS, "2500"),
            (ENV_LOG_FORMAT, "JSON"),
        ]))
        .unwrap();

        assert_eq!(config.brokers, "k1:9092,k2:9092");
        assert_eq!(config.group_id, "billing");
        assert_eq!(config.default_partitions, 6);
        assert_eq!(config.probe_timeout(), Duration::from_millis(2500));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup(&[(ENV_CLIENT_ID, "  ")])).unwrap();
        assert_eq!(config.client_id, DEFAULT_CLIENT_ID);
    }

    #[test]
    fn test_unparsable_number_is_rejected() {
        let err = Config::from_lookup(lookup(&[(ENV_TOPIC_PARTITIONS, "two")])).unwrap_err();
        assert!(matches!(err, SessionError::InvalidConfig(ref m) if m.contains(ENV_TOPIC_PARTITIONS)));
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        for (key, value) in [
            (ENV_TOPIC_PARTITIONS, "0"),
            (ENV_REPLICATION_FACTOR, "-1"),
            (ENV_CONNECT_TIMEOUT_MS, "10"),
            (ENV_MESSAGE_TIMEOUT_MS, "600001"),
        ] {
            let err = Config::from_lookup(lookup(&[(key, value)])).unwrap_err();
            assert!(
                matches!(err, SessionError::InvalidConfig(ref m) if m.contains(key)),
                "{}={} should be rejected",
                key,
                value
            );
        }
    }

    #[test]
    fn test_broker_list_of_commas_is_rejected() {
        let err = Config::from_lookup(lookup(&[(ENV_BROKERS, " , ,")])).unwrap_err();
        assert!(matches!(err, SessionError::InvalidConfig(_)));
    }

    #[test]
    fn test_unknown_log_format() {
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(" Pretty ".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::Json.to_string(), "json");
    }
}
