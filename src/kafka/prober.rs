//! Broker availability probe
//!
//! Answers "is the broker reachable" by opening an admin session and closing
//! it straight away. Nothing is created or modified on the broker.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::error::SessionError;
use super::session::BrokerConnector;

pub struct AvailabilityProber {
    connector: Arc<dyn BrokerConnector>,
    timeout: Duration,
}

impl AvailabilityProber {
    /// `timeout` bounds the whole probe, open and close included
    pub fn new(connector: Arc<dyn BrokerConnector>, timeout: Duration) -> Self {
        Self { connector, timeout }
    }

    /// True if an admin session could be opened within the timeout
    ///
    /// Never fails: every error, and running out of time, is reported as
    /// `false`.
    pub async fn probe(&self) -> bool {
        let attempt = async {
            let mut admin = self.connector.open_admin().await?;
            if let Err(e) = admin.close().await {
                warn!(error = %e, "Failed to close probe session");
            }
            Ok::<_, SessionError>(())
        };

        match tokio::time::timeout(self.timeout, attempt).await {
            Ok(Ok(())) => {
                info!("broker is reachable");
                true
            }
            Ok(Err(e)) => {
                warn!(error = %e, "broker is not reachable");
                false
            }
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "broker is not reachable");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kafka::session::MockBrokerConnector;
    use crate::testing::InMemoryBroker;
    use tracing_test::traced_test;

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[tokio::test]
    #[traced_test]
    async fn test_reachable_broker() {
        let broker = InMemoryBroker::new();
        let prober = AvailabilityProber::new(broker.connector(), TIMEOUT);

        assert!(prober.probe().await);
        assert!(logs_contain("broker is reachable"));

        let counters = broker.counters();
        assert_eq!(counters.admin_opened, 1);
        assert_eq!(counters.admin_closed, 1);
        // Probing has no side effects on the catalog
        assert_eq!(broker.raw_topics(), vec!["__consumer_offsets"]);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_unreachable_broker() {
        let broker = InMemoryBroker::new();
        broker.set_reachable(false);
        let prober = AvailabilityProber::new(broker.connector(), TIMEOUT);

        assert!(!prober.probe().await);
        assert!(logs_contain("broker is not reachable"));
    }

    #[tokio::test]
    async fn test_connector_error_is_false() {
        let mut connector = MockBrokerConnector::new();
        connector
            .expect_open_admin()
            .times(1)
            .returning(|| Err(SessionError::Admin("authorization failed".to_string())));

        let prober = AvailabilityProber::new(Arc::new(connector), TIMEOUT);
        assert!(!prober.probe().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_broker_times_out() {
        let broker = InMemoryBroker::new();
        broker.hang_admin(true);
        let prober = AvailabilityProber::new(broker.connector(), Duration::from_secs(3));

        let started = tokio::time::Instant::now();
        assert!(!prober.probe().await);
        assert!(started.elapsed() >= Duration::from_secs(3));
        assert!(started.elapsed() < TIMEOUT);
    }
}
