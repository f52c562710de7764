//! Availability prober E2E tests

use kafka_sessions::kafka::{AvailabilityProber, RdKafkaConnector};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::common::{test_config, TestResult};
use crate::setup::TestContext;

/// A running broker probes as reachable
pub async fn test_probe_reachable() -> TestResult {
    let ctx = TestContext::new()?;
    assert!(ctx.service.is_available().await, "broker should be reachable");
    Ok(())
}

/// A closed port probes as unreachable within the probe timeout
pub async fn test_probe_unreachable() -> TestResult {
    let config = kafka_sessions::Config {
        brokers: "127.0.0.1:1".to_string(),
        connect_timeout_ms: 1_000,
        ..test_config("probe-unreachable")
    };
    let prober = AvailabilityProber::new(
        Arc::new(RdKafkaConnector::new(&config)),
        Duration::from_secs(3),
    );

    let started = Instant::now();
    assert!(!prober.probe().await, "closed port should not be reachable");
    assert!(started.elapsed() < Duration::from_secs(5));
    Ok(())
}
