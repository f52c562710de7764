//! kafka_sessions E2E Test Suite
//!
//! End-to-end tests of the session layer against a live Kafka broker with:
//! - Test isolation via unique topic names and per-test consumer groups
//! - Cleanup through the topic registry
//! - Custom assertions on topic listings
//! - Independent rdkafka consumers to verify published data
//!
//! ## Test Categories
//!
//! - **registry**: topic create/list/delete
//! - **publisher**: publish and read back
//! - **prober**: broker availability
//! - **orchestrator**: collection and background consumption
//!
//! ## Usage
//!
//! ```bash
//! # Run all tests against localhost:9092
//! cargo run -p kafka_test --release
//!
//! # Against another broker
//! KAFKA_BROKERS="kafka:9092" cargo run -p kafka_test --release
//! ```

// Infrastructure modules
pub mod assertions;
pub mod common;
pub mod fixtures;
pub mod setup;

// Test modules
pub mod orchestrator;
pub mod prober;
pub mod publisher;
pub mod registry;

// Re-export infrastructure
pub use assertions::*;
pub use fixtures::*;
pub use setup::{verify_broker_ready, TestContext};

// Re-export test functions for convenience
pub use orchestrator::{
    test_background_follows_new_topics, test_collect_from_all_topics, test_collect_from_topic,
    test_collect_same_topic_twice,
};
pub use prober::{test_probe_reachable, test_probe_unreachable};
pub use publisher::{test_publish_and_verify, test_publish_null_value};
pub use registry::{
    test_create_duplicate, test_create_requires_name, test_create_then_list, test_delete_topic,
};
