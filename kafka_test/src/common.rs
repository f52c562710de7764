//! Common utilities shared across E2E test modules
//!
//! Broker address, session configuration and raw rdkafka clients used to
//! verify what the session layer did.

use kafka_sessions::Config;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::StreamConsumer;
use std::env;
use std::time::Duration;

/// Test result type alias for cleaner function signatures
pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Broker list from KAFKA_BROKERS or the local default
pub fn get_bootstrap_servers() -> String {
    env::var("KAFKA_BROKERS").unwrap_or_else(|_| "localhost:9092".to_string())
}

/// Session configuration pointed at the test broker with its own group
pub fn test_config(group_id: &str) -> Config {
    Config {
        brokers: get_bootstrap_servers(),
        client_id: "kafka-sessions-e2e".to_string(),
        group_id: group_id.to_string(),
        connect_timeout_ms: 5_000,
        probe_timeout_ms: 5_000,
        ..Config::default()
    }
}

/// Independent consumer for checking published messages
pub fn create_verification_consumer(
    group_id: &str,
) -> Result<StreamConsumer, Box<dyn std::error::Error>> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", get_bootstrap_servers())
        .set("group.id", group_id)
        .set("auto.offset.reset", "earliest")
        .set("enable.auto.commit", "false")
        .create()?;

    Ok(consumer)
}

/// Default test timeout duration
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Time to wait for a topic to show up in metadata after creation
pub const TOPIC_PROPAGATION: Duration = Duration::from_millis(500);
