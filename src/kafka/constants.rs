//! Broker session constants
//!
//! This module centralizes the defaults and limits used by the session layer.
//! Configuration falls back to these values when an environment variable is
//! not set, and validation rejects values outside the MIN/MAX bounds.

// ===== Broker Endpoint Defaults =====

/// Default bootstrap broker list
pub const DEFAULT_BROKERS: &str = "localhost:9092";

/// Default client identity reported to the broker
pub const DEFAULT_CLIENT_ID: &str = "my-app";

/// Default consumer group identity shared by every consumption activity
pub const DEFAULT_GROUP_ID: &str = "test-group";

// ===== Topic Defaults =====

/// Partition count used when creating topics
pub const DEFAULT_TOPIC_PARTITIONS: i32 = 2;

/// Replication factor used when creating topics (single-node friendly)
pub const DEFAULT_REPLICATION_FACTOR: i32 = 1;

/// Reserved prefix for broker-internal topics such as `__consumer_offsets`
///
/// Topics carrying this prefix are hidden from every listing, collection
/// and bulk-delete operation.
pub const INTERNAL_TOPIC_PREFIX: &str = "__";

// ===== Timeouts =====

/// Time allowed for the initial metadata fetch that proves a session is connected
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Broker-side timeout for create/delete topic requests
pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 10_000;

/// Delivery timeout for a single published message
pub const DEFAULT_MESSAGE_TIMEOUT_MS: u64 = 30_000;

/// Upper bound on a whole availability probe
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 10_000;

/// Flush timeout applied when a producer session closes
pub const PRODUCER_CLOSE_FLUSH_MS: u64 = 5_000;

/// Minimum accepted value for any configured timeout
pub const MIN_TIMEOUT_MS: u64 = 100;

/// Maximum accepted value for any configured timeout (10 minutes)
pub const MAX_TIMEOUT_MS: u64 = 600_000;

// ===== Consumer Settings =====

/// Offset reset policy for partitions whose start offset is out of range
pub const CONSUMER_AUTO_OFFSET_RESET: &str = "earliest";

/// Offsets are never committed: every (re)subscribe assigns partitions at the
/// beginning of the log, so a stored position would never be read back
pub const CONSUMER_ENABLE_AUTO_COMMIT: &str = "false";

/// How often a subscription retries topics missing from cluster metadata
pub const CONSUMER_PENDING_TOPIC_RETRY_MS: u64 = 1_000;

/// Session timeout for the shared consumer group member
pub const CONSUMER_SESSION_TIMEOUT_MS: u64 = 10_000;

// ===== Producer Settings =====

/// Acknowledgment level (leader only, matches single-node brokers)
pub const PRODUCER_ACKS: &str = "1";

// ===== Environment Variables =====

pub const ENV_BROKERS: &str = "KAFKA_BROKERS";
pub const ENV_CLIENT_ID: &str = "KAFKA_CLIENT_ID";
pub const ENV_GROUP_ID: &str = "KAFKA_GROUP_ID";
pub const ENV_TOPIC_PARTITIONS: &str = "KAFKA_TOPIC_PARTITIONS";
pub const ENV_REPLICATION_FACTOR: &str = "KAFKA_REPLICATION_FACTOR";
pub const ENV_CONNECT_TIMEOUT_MS: &str = "KAFKA_CONNECT_TIMEOUT_MS";
pub const ENV_OPERATION_TIMEOUT_MS: &str = "KAFKA_OPERATION_TIMEOUT_MS";
pub const ENV_MESSAGE_TIMEOUT_MS: &str = "KAFKA_MESSAGE_TIMEOUT_MS";
pub const ENV_PROBE_TIMEOUT_MS: &str = "KAFKA_PROBE_TIMEOUT_MS";
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";

/// Default log output format
pub const DEFAULT_LOG_FORMAT: &str = "pretty";
