//! Test fixtures
//!
//! Message generators and polling helpers.

use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::Message;
use std::future::Future;
use std::time::Duration;

use crate::common::TEST_TIMEOUT;

/// Generate N payloads with sequential values
pub fn generate_payloads(count: usize, prefix: &str) -> Vec<String> {
    (0..count).map(|i| format!("{}-value-{}", prefix, i)).collect()
}

/// Poll `check` until it returns true or `timeout` passes
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    false
}

/// Read up to `expected` payloads from `topic` with an independent consumer
pub async fn consume_payloads(
    consumer: &StreamConsumer,
    topic: &str,
    expected: usize,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    consumer.subscribe(&[topic])?;

    let mut payloads = Vec::new();
    let deadline = tokio::time::Instant::now() + TEST_TIMEOUT;
    while payloads.len() < expected {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        match tokio::time::timeout(remaining, consumer.recv()).await {
            Ok(Ok(message)) => {
                let payload = message
                    .payload()
                    .map(|p| String::from_utf8_lossy(p).into_owned())
                    .unwrap_or_default();
                payloads.push(payload);
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => break,
        }
    }

    Ok(payloads)
}
