//! Testing utilities for kafka_sessions
//!
//! Only compiled for unit tests.
//!
//! # Organization
//! - `mocks.rs` - In-memory broker implementing the session traits
//! - `helpers.rs` - Polling and naming helpers

#![cfg(test)]

pub mod helpers;
pub mod mocks;

pub use helpers::{unique_topic, wait_for};
pub use mocks::{InMemoryBroker, SessionCounters};
