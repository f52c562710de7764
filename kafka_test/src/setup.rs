//! Test environment setup and teardown
//!
//! Provides TestContext for test isolation with cleanup through the topic
//! registry under test.

use kafka_sessions::kafka::{BrokerService, RdKafkaConnector, TopicRegistry};
use kafka_sessions::Config;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::common::{test_config, TestResult};

/// Test context providing isolation and cleanup
///
/// Each test should create its own TestContext which:
/// - Generates unique topic names to prevent collisions
/// - Uses its own consumer group so committed offsets never leak between tests
/// - Deletes every topic it handed out on `cleanup`
pub struct TestContext {
    /// Unique identifier for this test run
    pub test_id: String,
    pub config: Config,
    pub service: BrokerService,
    registry: TopicRegistry,
    /// Topics created during this test
    topics_created: Arc<Mutex<Vec<String>>>,
}

impl TestContext {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let test_id = Uuid::new_v4().to_string()[..8].to_string();
        let config = test_config(&format!("e2e-group-{}", test_id));
        let connector = Arc::new(RdKafkaConnector::new(&config));

        Ok(Self {
            service: BrokerService::new(connector.clone(), &config)?,
            registry: TopicRegistry::new(
                connector,
                config.default_partitions,
                config.replication_factor,
            ),
            test_id,
            config,
            topics_created: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Generate a unique topic name for this test
    ///
    /// The name is tracked for cleanup.
    pub async fn unique_topic(&self, base: &str) -> String {
        let uuid_str = Uuid::new_v4().to_string();
        let name = format!("{}-{}-{}", base, self.test_id, &uuid_str[..8]);
        self.topics_created.lock().await.push(name.clone());
        name
    }

    /// Create a uniquely named topic through the service
    pub async fn create_topic(&self, base: &str) -> Result<String, Box<dyn std::error::Error>> {
        let name = self.unique_topic(base).await;
        self.service.create_topic(Some(&name)).await?;
        tokio::time::sleep(crate::common::TOPIC_PROPAGATION).await;
        Ok(name)
    }

    /// Delete every topic this context handed out
    ///
    /// Topics a test already deleted are skipped silently.
    pub async fn cleanup(&self) -> TestResult {
        let topics = self.topics_created.lock().await;
        let existing = self.registry.list_topics().await?;
        for topic in topics.iter().filter(|t| existing.contains(t)) {
            self.registry.delete_topic(topic).await;
        }
        Ok(())
    }
}

/// Verify that the broker is ready to accept connections
pub async fn verify_broker_ready() -> TestResult {
    let ctx = TestContext::new()?;
    if ctx.service.is_available().await {
        Ok(())
    } else {
        Err(format!("broker {} is not reachable", ctx.config.brokers).into())
    }
}
