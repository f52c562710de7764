//! Broker session abstraction
//!
//! These traits define the contract between the session manager and the
//! client library that actually talks to the broker. Separating them out gives
//! us:
//! 1. Testability - registry, publisher and orchestrator run against an
//!    in-memory broker with fault injection
//! 2. A single place where the open/close discipline is expressed
//!
//! Admin and producer sessions are scoped: open immediately before one
//! operation, close immediately after. The consumer session is the one
//! long-lived, shared handle; the orchestrator serializes access to it.

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use tracing::warn;

use super::error::Result;

/// Topic creation parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSpec {
    pub name: String,
    pub partitions: i32,
    pub replication_factor: i32,
}

/// A message read from a topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Bytes>,
    pub payload: Option<Bytes>,
}

impl Message {
    /// Payload rendered as text for logging (lossy for non UTF-8 data)
    pub fn payload_lossy(&self) -> String {
        self.payload
            .as_ref()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .unwrap_or_default()
    }
}

/// Where a published message landed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

/// Control-plane handle
#[async_trait]
pub trait AdminSession: Send {
    /// Full topic catalog in broker order, internal topics included
    async fn list_topics(&mut self) -> Result<Vec<String>>;

    async fn create_topic(&mut self, topic: &TopicSpec) -> Result<()>;

    /// Delete every named topic in one request
    async fn delete_topics(&mut self, names: &[String]) -> Result<()>;

    /// Release the connection. Must tolerate being called more than once.
    async fn close(&mut self) -> Result<()>;
}

/// Publishing handle
#[async_trait]
pub trait ProducerSession: Send {
    async fn send(&mut self, topic: &str, payload: Option<&[u8]>) -> Result<DeliveryReport>;

    async fn close(&mut self) -> Result<()>;
}

/// Handle bound to the process-wide consumer group identity
#[async_trait]
pub trait ConsumerSession: Send {
    /// Join the broker. Reconnecting an already connected session is a no-op.
    async fn connect(&mut self) -> Result<()>;

    /// Replace the current subscription with `topics`, reading each from the
    /// beginning of its log. An empty slice clears the subscription.
    async fn subscribe(&mut self, topics: &[String]) -> Result<()>;

    /// Wait for the next message on the current subscription
    ///
    /// Must be cancel-safe: dropping the future before it completes loses
    /// no message. Problems confined to one topic or partition are reported
    /// as `SessionError::TransientConsumption`; the session stays usable.
    async fn recv(&mut self) -> Result<Message>;

    async fn disconnect(&mut self) -> Result<()>;
}

/// Connection factory bound to one broker endpoint and client identity
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    async fn open_admin(&self) -> Result<Box<dyn AdminSession>>;

    async fn open_producer(&self) -> Result<Box<dyn ProducerSession>>;

    /// The shared consumer handle. Performs no network I/O.
    fn consumer_identity(&self) -> Result<Box<dyn ConsumerSession>>;
}

/// Run `op` inside a freshly opened admin session and close it afterwards,
/// whether or not `op` succeeded.
///
/// A failure to close is logged; the operation's own result wins.
pub async fn with_admin<T, F>(connector: &dyn BrokerConnector, op: F) -> Result<T>
where
    F: for<'a> FnOnce(&'a mut dyn AdminSession) -> BoxFuture<'a, Result<T>>,
{
    let mut admin = connector.open_admin().await?;
    let result = op(admin.as_mut()).await;
    if let Err(e) = admin.close().await {
        warn!(error = %e, "Failed to close admin session");
    }
    result
}

/// Same discipline as [`with_admin`] for producer sessions
pub async fn with_producer<T, F>(connector: &dyn BrokerConnector, op: F) -> Result<T>
where
    F: for<'a> FnOnce(&'a mut dyn ProducerSession) -> BoxFuture<'a, Result<T>>,
{
    let mut producer = connector.open_producer().await?;
    let result = op(producer.as_mut()).await;
    if let Err(e) = producer.close().await {
        warn!(error = %e, "Failed to close producer session");
    }
    result
}
