//! Broker service facade
//!
//! The single entry point for the HTTP front end and the process bootstrap.
//! It wires the registry, publisher, orchestrator and prober to one
//! connector, performs the request-level input checks and produces the
//! confirmation strings returned to clients.

use bytes::Bytes;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::error::{Result, SessionError};
use super::orchestrator::{CollectOptions, ConsumerState, ConsumptionOrchestrator, TaggedPayload};
use super::prober::AvailabilityProber;
use super::publisher::Publisher;
use super::session::BrokerConnector;
use super::topics::TopicRegistry;
use crate::config::Config;

pub struct BrokerService {
    registry: TopicRegistry,
    publisher: Publisher,
    orchestrator: ConsumptionOrchestrator,
    prober: AvailabilityProber,
}

impl BrokerService {
    pub fn new(connector: Arc<dyn BrokerConnector>, config: &Config) -> Result<Self> {
        let orchestrator = ConsumptionOrchestrator::new(Arc::clone(&connector))?;
        let registry = TopicRegistry::new(
            Arc::clone(&connector),
            config.default_partitions,
            config.replication_factor,
        )
        .with_subscriptions(orchestrator.subscription_set());

        Ok(Self {
            registry,
            publisher: Publisher::new(Arc::clone(&connector)),
            prober: AvailabilityProber::new(connector, config.probe_timeout()),
            orchestrator,
        })
    }

    /// Create a topic named by the request
    ///
    /// Returns the confirmation message on success.
    pub async fn create_topic(&self, name: Option<&str>) -> Result<String> {
        let name = required(name, "Topic name is required")?;
        self.registry.create_topic(name).await?;
        Ok(format!("Topic {} created successfully", name))
    }

    /// Publish a text message; a missing message is sent as a null value
    pub async fn publish(&self, topic: Option<&str>, message: Option<&str>) -> Result<String> {
        let topic = required(topic, "Topic is required")?;
        self.publisher
            .publish(topic, message.map(str::as_bytes))
            .await?;
        Ok("Message sent successfully".to_string())
    }

    pub async fn list_topics(&self) -> Result<Vec<String>> {
        self.registry.list_topics().await
    }

    pub async fn delete_topic(&self, name: &str) -> bool {
        self.registry.delete_topic(name).await
    }

    pub async fn delete_all_topics(&self) -> bool {
        self.registry.delete_all_topics().await
    }

    pub async fn collect_from_topic(
        &self,
        name: &str,
        options: CollectOptions,
    ) -> Result<Vec<Bytes>> {
        self.orchestrator.collect_from_topic(name, options).await
    }

    pub async fn collect_from_all_topics(
        &self,
        options: CollectOptions,
    ) -> Result<Vec<TaggedPayload>> {
        self.orchestrator.collect_from_all_topics(options).await
    }

    pub async fn is_available(&self) -> bool {
        self.prober.probe().await
    }

    /// Start background consumption if the broker answers a probe
    ///
    /// Returns `None` without touching the consumer when the broker is down.
    pub async fn start_if_available(
        &self,
        cancel: CancellationToken,
    ) -> Result<Option<JoinHandle<()>>> {
        if !self.prober.probe().await {
            warn!("Kafka is not running, background consumer not started");
            return Ok(None);
        }

        let handle = self.orchestrator.start_background_consumption(cancel).await?;
        info!(topics = ?self.orchestrator.subscriptions(), "Background consumer started");
        Ok(Some(handle))
    }

    pub fn consumer_state(&self) -> ConsumerState {
        self.orchestrator.state()
    }

    pub fn orchestrator(&self) -> &ConsumptionOrchestrator {
        &self.orchestrator
    }
}

fn required<'a>(value: Option<&'a str>, message: &str) -> Result<&'a str> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(SessionError::validation(message)),
    }
}
