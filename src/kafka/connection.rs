//! rdkafka-backed connection factory
//!
//! `RdKafkaConnector` turns a [`Config`] into admin, producer and consumer
//! sessions. Admin and producer sessions prove the broker is reachable by
//! fetching cluster metadata before they are handed out, so an unreachable
//! broker surfaces as `SessionError::Connection` at open time.
//!
//! librdkafka metadata calls and client teardown block the calling thread;
//! they run on tokio's blocking pool.
//!
//! The consumer assigns partitions itself, each at the beginning of its log,
//! with auto-commit off. Committed group offsets would otherwise make a second
//! read of the same topic resume where the first one stopped.

use async_trait::async_trait;
use bytes::Bytes;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::{Client, ClientContext, DefaultClientContext};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use rdkafka::{Message as _, Offset, TopicPartitionList};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::constants::{
    CONSUMER_AUTO_OFFSET_RESET, CONSUMER_ENABLE_AUTO_COMMIT, CONSUMER_PENDING_TOPIC_RETRY_MS,
    CONSUMER_SESSION_TIMEOUT_MS, PRODUCER_ACKS, PRODUCER_CLOSE_FLUSH_MS,
};
use super::error::{Result, SessionError};
use super::session::{
    AdminSession, BrokerConnector, ConsumerSession, DeliveryReport, Message, ProducerSession,
    TopicSpec,
};
use crate::config::Config;

type Admin = AdminClient<DefaultClientContext>;

/// Production connector bound to one broker endpoint and client identity
pub struct RdKafkaConnector {
    brokers: String,
    client_id: String,
    group_id: String,
    connect_timeout: Duration,
    operation_timeout: Duration,
    message_timeout: Duration,
}

impl RdKafkaConnector {
    pub fn new(config: &Config) -> Self {
        Self {
            brokers: config.brokers.clone(),
            client_id: config.client_id.clone(),
            group_id: config.group_id.clone(),
            connect_timeout: config.connect_timeout(),
            operation_timeout: config.operation_timeout(),
            message_timeout: config.message_timeout(),
        }
    }

    /// Settings shared by every client kind
    fn base_config(&self) -> ClientConfig {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", &self.brokers)
            .set("client.id", &self.client_id);
        client_config
    }

    fn producer_config(&self) -> ClientConfig {
        let mut client_config = self.base_config();
        client_config
            .set(
                "message.timeout.ms",
                self.message_timeout.as_millis().to_string(),
            )
            // Leader-only acknowledgment (single-node friendly)
            .set("acks", PRODUCER_ACKS);
        client_config
    }

    fn consumer_config(&self) -> ClientConfig {
        let mut client_config = self.base_config();
        client_config
            .set("group.id", &self.group_id)
            .set("auto.offset.reset", CONSUMER_AUTO_OFFSET_RESET)
            .set("enable.auto.commit", CONSUMER_ENABLE_AUTO_COMMIT)
            .set("session.timeout.ms", CONSUMER_SESSION_TIMEOUT_MS.to_string());
        client_config
    }
}

/// Every topic name known to the cluster, internal ones included
///
/// Blocking. Doubles as the reachability check: librdkafka connects lazily,
/// so a metadata round-trip is the first proof that a broker answered.
fn topic_names<C: ClientContext>(client: &Client<C>, timeout: Duration) -> Result<Vec<String>> {
    let metadata = client
        .fetch_metadata(None, timeout)
        .map_err(|e| SessionError::connection(format!("Failed to fetch metadata: {}", e)))?;

    Ok(metadata
        .topics()
        .iter()
        .map(|topic| topic.name().to_string())
        .collect())
}

#[async_trait]
impl BrokerConnector for RdKafkaConnector {
    async fn open_admin(&self) -> Result<Box<dyn AdminSession>> {
        let client: Admin = self
            .base_config()
            .create()
            .map_err(|e| SessionError::connection(format!("Failed to create admin client: {}", e)))?;
        let client = Arc::new(client);

        let probe = Arc::clone(&client);
        let timeout = self.connect_timeout;
        tokio::task::spawn_blocking(move || topic_names(probe.inner(), timeout)).await??;

        debug!(brokers = %self.brokers, "Admin session opened");
        Ok(Box::new(RdKafkaAdmin {
            client: Some(client),
            metadata_timeout: self.connect_timeout,
            operation_timeout: self.operation_timeout,
        }))
    }

    async fn open_producer(&self) -> Result<Box<dyn ProducerSession>> {
        let producer: FutureProducer = self
            .producer_config()
            .create()
            .map_err(|e| SessionError::connection(format!("Failed to create producer: {}", e)))?;

        let probe = producer.clone();
        let timeout = self.connect_timeout;
        tokio::task::spawn_blocking(move || topic_names(probe.client(), timeout)).await??;

        debug!(brokers = %self.brokers, "Producer session opened");
        Ok(Box::new(RdKafkaProducer {
            producer: Some(producer),
            message_timeout: self.message_timeout,
        }))
    }

    fn consumer_identity(&self) -> Result<Box<dyn ConsumerSession>> {
        Ok(Box::new(RdKafkaConsumer {
            client_config: self.consumer_config(),
            connect_timeout: self.connect_timeout,
            consumer: None,
            topics: Vec::new(),
            pending: Vec::new(),
        }))
    }
}

/// Admin session over one `AdminClient`
struct RdKafkaAdmin {
    /// `None` once closed
    client: Option<Arc<Admin>>,
    metadata_timeout: Duration,
    operation_timeout: Duration,
}

impl RdKafkaAdmin {
    fn client(&self) -> Result<&Arc<Admin>> {
        self.client
            .as_ref()
            .ok_or_else(|| SessionError::connection("admin session is closed"))
    }

    fn options(&self) -> AdminOptions {
        AdminOptions::new().operation_timeout(Some(self.operation_timeout))
    }
}

#[async_trait]
impl AdminSession for RdKafkaAdmin {
    async fn list_topics(&mut self) -> Result<Vec<String>> {
        let client = Arc::clone(self.client()?);
        let timeout = self.metadata_timeout;
        tokio::task::spawn_blocking(move || topic_names(client.inner(), timeout)).await?
    }

    async fn create_topic(&mut self, topic: &TopicSpec) -> Result<()> {
        let new_topic = NewTopic::new(
            &topic.name,
            topic.partitions,
            TopicReplication::Fixed(topic.replication_factor),
        );

        let results = self
            .client()?
            .create_topics(&[new_topic], &self.options())
            .await
            .map_err(|e| SessionError::Admin(format!("Create topics request failed: {}", e)))?;

        for result in results {
            match result {
                Ok(_) => {}
                Err((name, RDKafkaErrorCode::TopicAlreadyExists)) => {
                    return Err(SessionError::TopicExists(name));
                }
                Err((name, code)) => {
                    return Err(SessionError::Admin(format!(
                        "Failed to create topic {}: {}",
                        name, code
                    )));
                }
            }
        }
        Ok(())
    }

    async fn delete_topics(&mut self, names: &[String]) -> Result<()> {
        let names: Vec<&str> = names.iter().map(String::as_str).collect();

        let results = self
            .client()?
            .delete_topics(&names, &self.options())
            .await
            .map_err(|e| SessionError::Admin(format!("Delete topics request failed: {}", e)))?;

        for result in results {
            match result {
                Ok(_) => {}
                Err((name, RDKafkaErrorCode::UnknownTopicOrPartition)) => {
                    return Err(SessionError::TopicNotFound(name));
                }
                Err((name, code)) => {
                    return Err(SessionError::Admin(format!(
                        "Failed to delete topic {}: {}",
                        name, code
                    )));
                }
            }
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(client) = self.client.take() {
            // Dropping the client joins its background polling thread
            tokio::task::spawn_blocking(move || drop(client)).await?;
            debug!("Admin session closed");
        }
        Ok(())
    }
}

/// Producer session over one `FutureProducer`
struct RdKafkaProducer {
    /// `None` once closed
    producer: Option<FutureProducer>,
    message_timeout: Duration,
}

#[async_trait]
impl ProducerSession for RdKafkaProducer {
    async fn send(&mut self, topic: &str, payload: Option<&[u8]>) -> Result<DeliveryReport> {
        let producer = self
            .producer
            .as_ref()
            .ok_or_else(|| SessionError::publish(topic, "producer session is closed"))?;

        let mut record = FutureRecord::<(), [u8]>::to(topic);
        if let Some(payload) = payload {
            record = record.payload(payload);
        }

        let (partition, offset) = producer
            .send(record, Timeout::After(self.message_timeout))
            .await
            .map_err(|(err, _)| SessionError::publish(topic, err))?;

        Ok(DeliveryReport {
            topic: topic.to_string(),
            partition,
            offset,
        })
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(producer) = self.producer.take() {
            let flushed = tokio::task::spawn_blocking(move || {
                producer.flush(Timeout::After(Duration::from_millis(PRODUCER_CLOSE_FLUSH_MS)))
            })
            .await?;
            flushed.map_err(|e| SessionError::connection(format!("Failed to flush producer: {}", e)))?;
            debug!("Producer session closed");
        }
        Ok(())
    }
}

/// Partitions of each requested topic, read from cluster metadata. Blocking.
///
/// Topics the broker does not report yet (not created, or not propagated) are
/// returned separately.
fn partition_layout<C: ClientContext>(
    client: &Client<C>,
    topics: &[String],
    timeout: Duration,
) -> Result<(Vec<(String, Vec<i32>)>, Vec<String>)> {
    let metadata = client
        .fetch_metadata(None, timeout)
        .map_err(|e| SessionError::consumption(format!("Failed to fetch metadata: {}", e)))?;

    let mut found = Vec::new();
    let mut missing = Vec::new();
    for name in topics {
        let known = metadata
            .topics()
            .iter()
            .find(|topic| topic.name() == name.as_str())
            .filter(|topic| topic.error().is_none() && !topic.partitions().is_empty());

        match known {
            Some(topic) => found.push((
                name.clone(),
                topic.partitions().iter().map(|p| p.id()).collect(),
            )),
            None => missing.push(name.clone()),
        }
    }
    Ok((found, missing))
}

/// Assignment covering every partition in `layout`
///
/// Partitions with a valid position in `current` keep it; all others start at
/// the beginning of their log.
fn beginning_assignment(
    layout: &[(String, Vec<i32>)],
    current: &TopicPartitionList,
) -> Result<TopicPartitionList> {
    let mut assignment = TopicPartitionList::new();
    for (topic, partitions) in layout {
        for &partition in partitions {
            let offset = current
                .find_partition(topic, partition)
                .map(|elem| elem.offset())
                .filter(|offset| *offset != Offset::Invalid)
                .unwrap_or(Offset::Beginning);
            assignment
                .add_partition_offset(topic, partition, offset)
                .map_err(|e| SessionError::consumption(format!("Invalid assignment: {}", e)))?;
        }
    }
    Ok(assignment)
}

/// Classify a receive failure
///
/// librdkafka reports per-topic and per-partition problems through the same
/// channel as messages; those leave the consumer usable.
fn receive_error(err: KafkaError) -> SessionError {
    match &err {
        KafkaError::MessageConsumption(_) | KafkaError::PartitionEOF(_) => {
            SessionError::transient_consumption(format!("Failed to receive: {}", err))
        }
        _ => SessionError::consumption(format!("Failed to receive: {}", err)),
    }
}

/// The shared consumer group member
///
/// The underlying `StreamConsumer` is created on connect and destroyed on
/// disconnect; the group identity stays the same across reconnects.
///
/// Partitions are assigned explicitly rather than through group rebalancing,
/// each one at the beginning of its log, and nothing is committed. Reading
/// the same topic twice therefore yields the same messages twice.
struct RdKafkaConsumer {
    client_config: ClientConfig,
    connect_timeout: Duration,
    consumer: Option<Arc<StreamConsumer>>,
    /// Current subscription, in request order
    topics: Vec<String>,
    /// Subscribed topics not in cluster metadata yet
    pending: Vec<String>,
}

impl RdKafkaConsumer {
    fn consumer(&self) -> Result<&Arc<StreamConsumer>> {
        self.consumer
            .as_ref()
            .ok_or_else(|| SessionError::consumption("consumer is not connected"))
    }

    /// Assign every known partition of the subscription
    ///
    /// With `resume`, partitions already assigned keep their position. Topics
    /// missing from metadata are left in `pending`.
    async fn assign(&mut self, resume: bool) -> Result<()> {
        let consumer = Arc::clone(self.consumer()?);
        let topics = self.topics.clone();
        let timeout = self.connect_timeout;

        let pending = tokio::task::spawn_blocking(move || {
            let (layout, missing) = partition_layout(consumer.client(), &topics, timeout)?;
            let current = if resume {
                consumer
                    .position()
                    .map_err(|e| SessionError::consumption(format!("Failed to read positions: {}", e)))?
            } else {
                TopicPartitionList::new()
            };
            let assignment = beginning_assignment(&layout, &current)?;
            consumer
                .assign(&assignment)
                .map_err(|e| SessionError::consumption(format!("Failed to subscribe: {}", e)))?;
            Ok::<_, SessionError>(missing)
        })
        .await??;

        self.pending = pending;
        Ok(())
    }
}

async fn receive(consumer: &StreamConsumer) -> Result<Message> {
    let message = consumer.recv().await.map_err(receive_error)?;

    Ok(Message {
        topic: message.topic().to_string(),
        partition: message.partition(),
        offset: message.offset(),
        key: message.key().map(Bytes::copy_from_slice),
        payload: message.payload().map(Bytes::copy_from_slice),
    })
}

#[async_trait]
impl ConsumerSession for RdKafkaConsumer {
    async fn connect(&mut self) -> Result<()> {
        if self.consumer.is_some() {
            return Ok(());
        }

        let consumer: StreamConsumer = self
            .client_config
            .create()
            .map_err(|e| SessionError::connection(format!("Failed to create consumer: {}", e)))?;
        let consumer = Arc::new(consumer);

        let probe = Arc::clone(&consumer);
        let timeout = self.connect_timeout;
        tokio::task::spawn_blocking(move || topic_names(probe.client(), timeout)).await??;

        debug!("Consumer connected");
        self.consumer = Some(consumer);
        Ok(())
    }

    async fn subscribe(&mut self, topics: &[String]) -> Result<()> {
        self.consumer()?;
        self.topics = topics.to_vec();
        self.assign(false).await?;

        if !self.pending.is_empty() {
            warn!(topics = ?self.pending, "Subscribed topics not available yet, retrying");
        }
        Ok(())
    }

    async fn recv(&mut self) -> Result<Message> {
        let retry = Duration::from_millis(CONSUMER_PENDING_TOPIC_RETRY_MS);
        loop {
            let consumer = Arc::clone(self.consumer()?);
            if self.pending.is_empty() {
                return receive(&consumer).await;
            }

            tokio::select! {
                received = receive(&consumer) => return received,
                _ = tokio::time::sleep(retry) => {
                    self.assign(true).await?;
                    if self.pending.is_empty() {
                        debug!(topics = ?self.topics, "Every subscribed topic is assigned");
                    }
                }
            }
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.topics.clear();
        self.pending.clear();
        if let Some(consumer) = self.consumer.take() {
            // Dropping the consumer closes it, which blocks
            tokio::task::spawn_blocking(move || {
                if let Err(e) = consumer.assign(&TopicPartitionList::new()) {
                    warn!(error = %e, "Failed to unassign consumer partitions");
                }
                drop(consumer);
            })
            .await?;
            debug!("Consumer disconnected");
        }
        Ok(())
    }
}
