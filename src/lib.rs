//! Kafka broker session management
//!
//! A thin layer over a Kafka broker that manages scoped admin and producer
//! sessions, a single shared consumer group identity, and topic lifecycle,
//! exposed through [`kafka::BrokerService`].

pub mod config;
pub mod kafka;
pub mod telemetry;

// Test utilities (only compiled in test builds)
#[cfg(test)]
pub mod testing;

pub use config::{Config, LogFormat};
pub use kafka::{BrokerService, RdKafkaConnector, Result, SessionError};
