//! In-memory broker for unit tests
//!
//! `InMemoryBroker` implements the session traits against a process-local
//! topic catalog so registry, publisher, prober and orchestrator can be tested
//! without a Kafka cluster. It records how many sessions were opened and
//! closed and lets tests inject failures (unreachable broker, failing sends,
//! failing subscribes, a failing receive, a hanging admin connect).
//!
//! Like the rdkafka consumer, every (re)subscribe reads each topic from the
//! beginning of its log, and a subscribed topic that does not exist yet is
//! picked up from offset 0 once it is created.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;

use crate::kafka::error::{Result, SessionError};
use crate::kafka::session::{
    AdminSession, BrokerConnector, ConsumerSession, DeliveryReport, Message, ProducerSession,
    TopicSpec,
};

/// Session open/close bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCounters {
    pub admin_opened: usize,
    pub admin_closed: usize,
    pub producer_opened: usize,
    pub producer_closed: usize,
    pub consumer_connects: usize,
    pub consumer_disconnects: usize,
}

#[derive(Debug)]
struct TopicLog {
    name: String,
    partitions: Vec<Vec<Option<Bytes>>>,
    next_partition: usize,
}

/// Error returned by the next receive
#[derive(Debug, Clone, Copy)]
enum RecvFault {
    /// The consumer cannot carry on
    Fatal,
    /// A per-topic problem; the consumer stays usable
    Transient,
}

#[derive(Debug)]
struct BrokerState {
    /// Topics in creation order
    topics: Vec<TopicLog>,
    reachable: bool,
    hang_admin: bool,
    fail_sends: bool,
    fail_subscribe: bool,
    recv_fault: Option<RecvFault>,
    counters: SessionCounters,
    delete_requests: Vec<Vec<String>>,
    subscribe_history: Vec<Vec<String>>,
    active_subscription: Vec<String>,
}

impl BrokerState {
    fn topic(&self, name: &str) -> Option<&TopicLog> {
        self.topics.iter().find(|t| t.name == name)
    }

    fn topic_mut(&mut self, name: &str) -> Option<&mut TopicLog> {
        self.topics.iter_mut().find(|t| t.name == name)
    }
}

#[derive(Debug)]
struct Shared {
    state: Mutex<BrokerState>,
    /// Wakes consumers waiting for new messages or faults
    notify: Notify,
}

/// Cloneable handle to a fake broker
#[derive(Debug, Clone)]
pub struct InMemoryBroker {
    shared: Arc<Shared>,
}

impl InMemoryBroker {
    /// A reachable broker whose catalog already holds `__consumer_offsets`
    pub fn new() -> Self {
        let broker = Self {
            shared: Arc::new(Shared {
                state: Mutex::new(BrokerState {
                    topics: Vec::new(),
                    reachable: true,
                    hang_admin: false,
                    fail_sends: false,
                    fail_subscribe: false,
                    recv_fault: None,
                    counters: SessionCounters::default(),
                    delete_requests: Vec::new(),
                    subscribe_history: Vec::new(),
                    active_subscription: Vec::new(),
                }),
                notify: Notify::new(),
            }),
        };
        broker.seed_topic("__consumer_offsets", 1);
        broker
    }

    pub fn connector(&self) -> Arc<dyn BrokerConnector> {
        Arc::new(self.clone())
    }

    /// Create a topic directly, bypassing the admin API
    pub fn seed_topic(&self, name: &str, partitions: usize) {
        let mut state = self.shared.state.lock();
        if state.topic(name).is_none() {
            state.topics.push(TopicLog {
                name: name.to_string(),
                partitions: vec![Vec::new(); partitions.max(1)],
                next_partition: 0,
            });
        }
    }

    /// Append a message, spreading across partitions round-robin
    ///
    /// Panics if the topic does not exist.
    pub fn append(&self, topic: &str, payload: &str) -> (i32, i64) {
        let report = {
            let mut state = self.shared.state.lock();
            let log = state
                .topic_mut(topic)
                .unwrap_or_else(|| panic!("unknown topic {}", topic));
            append_to_log(log, Some(Bytes::copy_from_slice(payload.as_bytes())))
        };
        self.shared.notify.notify_waiters();
        report
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.shared.state.lock().reachable = reachable;
    }

    /// Make admin connects wait forever
    pub fn hang_admin(&self, hang: bool) {
        self.shared.state.lock().hang_admin = hang;
    }

    pub fn fail_sends(&self, fail: bool) {
        self.shared.state.lock().fail_sends = fail;
    }

    pub fn fail_subscribe(&self, fail: bool) {
        self.shared.state.lock().fail_subscribe = fail;
    }

    /// The next receive on any consumer fails for good
    pub fn fail_next_recv(&self) {
        self.inject_recv_fault(RecvFault::Fatal);
    }

    /// The next receive on any consumer reports a transient error, the way
    /// librdkafka reports a subscribed topic that is not available
    pub fn transient_recv_error(&self) {
        self.inject_recv_fault(RecvFault::Transient);
    }

    fn inject_recv_fault(&self, fault: RecvFault) {
        self.shared.state.lock().recv_fault = Some(fault);
        self.shared.notify.notify_waiters();
    }

    pub fn counters(&self) -> SessionCounters {
        self.shared.state.lock().counters.clone()
    }

    /// Every topic name, internal ones included
    pub fn raw_topics(&self) -> Vec<String> {
        let state = self.shared.state.lock();
        state.topics.iter().map(|t| t.name.clone()).collect()
    }

    pub fn message_count(&self, topic: &str) -> usize {
        let state = self.shared.state.lock();
        state
            .topic(topic)
            .map(|t| t.partitions.iter().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Topic lists of every delete request received, in order
    pub fn delete_requests(&self) -> Vec<Vec<String>> {
        self.shared.state.lock().delete_requests.clone()
    }

    /// Topic lists of every subscribe call, in order
    pub fn subscribe_history(&self) -> Vec<Vec<String>> {
        self.shared.state.lock().subscribe_history.clone()
    }

    /// What the consumer is currently subscribed to
    pub fn active_subscription(&self) -> Vec<String> {
        self.shared.state.lock().active_subscription.clone()
    }

    fn check_reachable(&self) -> Result<()> {
        if self.shared.state.lock().reachable {
            Ok(())
        } else {
            Err(SessionError::connection("broker localhost:9092 unreachable"))
        }
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

fn append_to_log(log: &mut TopicLog, payload: Option<Bytes>) -> (i32, i64) {
    let partition = log.next_partition % log.partitions.len();
    log.next_partition += 1;
    let entries = &mut log.partitions[partition];
    entries.push(payload);
    (partition as i32, (entries.len() - 1) as i64)
}

#[async_trait]
impl BrokerConnector for InMemoryBroker {
    async fn open_admin(&self) -> Result<Box<dyn AdminSession>> {
        let hang = self.shared.state.lock().hang_admin;
        if hang {
            std::future::pending::<()>().await;
        }
        self.check_reachable()?;
        self.shared.state.lock().counters.admin_opened += 1;
        Ok(Box::new(FakeAdmin {
            broker: self.clone(),
            closed: false,
        }))
    }

    async fn open_producer(&self) -> Result<Box<dyn ProducerSession>> {
        self.check_reachable()?;
        self.shared.state.lock().counters.producer_opened += 1;
        Ok(Box::new(FakeProducer {
            broker: self.clone(),
            closed: false,
        }))
    }

    fn consumer_identity(&self) -> Result<Box<dyn ConsumerSession>> {
        Ok(Box::new(FakeConsumer {
            broker: self.clone(),
            connected: false,
            subscription: Vec::new(),
            cursors: HashMap::new(),
        }))
    }
}

struct FakeAdmin {
    broker: InMemoryBroker,
    closed: bool,
}

#[async_trait]
impl AdminSession for FakeAdmin {
    async fn list_topics(&mut self) -> Result<Vec<String>> {
        self.broker.check_reachable()?;
        Ok(self.broker.raw_topics())
    }

    async fn create_topic(&mut self, topic: &TopicSpec) -> Result<()> {
        self.broker.check_reachable()?;
        let mut state = self.broker.shared.state.lock();
        if state.topic(&topic.name).is_some() {
            return Err(SessionError::TopicExists(topic.name.clone()));
        }
        state.topics.push(TopicLog {
            name: topic.name.clone(),
            partitions: vec![Vec::new(); topic.partitions.max(1) as usize],
            next_partition: 0,
        });
        Ok(())
    }

    async fn delete_topics(&mut self, names: &[String]) -> Result<()> {
        self.broker.check_reachable()?;
        let mut state = self.broker.shared.state.lock();
        state.delete_requests.push(names.to_vec());
        if let Some(missing) = names.iter().find(|n| state.topic(n).is_none()) {
            return Err(SessionError::TopicNotFound(missing.clone()));
        }
        state.topics.retain(|t| !names.contains(&t.name));
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.broker.shared.state.lock().counters.admin_closed += 1;
        }
        Ok(())
    }
}

struct FakeProducer {
    broker: InMemoryBroker,
    closed: bool,
}

#[async_trait]
impl ProducerSession for FakeProducer {
    async fn send(&mut self, topic: &str, payload: Option<&[u8]>) -> Result<DeliveryReport> {
        let (partition, offset) = {
            let mut state = self.broker.shared.state.lock();
            if state.fail_sends {
                return Err(SessionError::publish(topic, "injected send failure"));
            }
            let log = state
                .topic_mut(topic)
                .ok_or_else(|| SessionError::publish(topic, "Broker: Unknown topic or partition"))?;
            append_to_log(log, payload.map(Bytes::copy_from_slice))
        };
        self.broker.shared.notify.notify_waiters();

        Ok(DeliveryReport {
            topic: topic.to_string(),
            partition,
            offset,
        })
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.broker.shared.state.lock().counters.producer_closed += 1;
        }
        Ok(())
    }
}

struct FakeConsumer {
    broker: InMemoryBroker,
    connected: bool,
    subscription: Vec<String>,
    /// Next offset to read per (topic, partition)
    cursors: HashMap<(String, usize), usize>,
}

impl FakeConsumer {
    /// Take the next unread message across the subscription, if any
    fn poll_message(&mut self) -> Result<Option<Message>> {
        let mut state = self.broker.shared.state.lock();
        match state.recv_fault.take() {
            Some(RecvFault::Fatal) => {
                return Err(SessionError::consumption("injected receive failure"));
            }
            Some(RecvFault::Transient) => {
                return Err(SessionError::transient_consumption(
                    "Subscribed topic not available: Broker: Unknown topic or partition",
                ));
            }
            None => {}
        }

        for topic in &self.subscription {
            let Some(log) = state.topic(topic) else {
                continue;
            };
            for (partition, entries) in log.partitions.iter().enumerate() {
                let cursor = self
                    .cursors
                    .entry((topic.clone(), partition))
                    .or_insert(0);
                if let Some(payload) = entries.get(*cursor) {
                    let message = Message {
                        topic: topic.clone(),
                        partition: partition as i32,
                        offset: *cursor as i64,
                        key: None,
                        payload: payload.clone(),
                    };
                    *cursor += 1;
                    return Ok(Some(message));
                }
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl ConsumerSession for FakeConsumer {
    async fn connect(&mut self) -> Result<()> {
        self.broker.check_reachable()?;
        if !self.connected {
            self.connected = true;
            self.broker.shared.state.lock().counters.consumer_connects += 1;
        }
        Ok(())
    }

    async fn subscribe(&mut self, topics: &[String]) -> Result<()> {
        if !self.connected {
            return Err(SessionError::consumption("consumer not connected"));
        }
        let mut state = self.broker.shared.state.lock();
        if state.fail_subscribe {
            return Err(SessionError::consumption("injected subscribe failure"));
        }
        state.subscribe_history.push(topics.to_vec());
        state.active_subscription = topics.to_vec();
        self.subscription = topics.to_vec();
        // Every (re)subscribe starts from the beginning of each log
        self.cursors.clear();
        Ok(())
    }

    async fn recv(&mut self) -> Result<Message> {
        let shared = Arc::clone(&self.broker.shared);
        loop {
            // Register interest before checking so a concurrent append
            // cannot slip between the check and the wait.
            let notified = shared.notify.notified();
            if let Some(message) = self.poll_message()? {
                return Ok(message);
            }
            notified.await;
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.connected {
            self.connected = false;
            self.subscription.clear();
            self.cursors.clear();
            let mut state = self.broker.shared.state.lock();
            state.active_subscription.clear();
            state.counters.consumer_disconnects += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_broker_has_internal_topic() {
        let broker = InMemoryBroker::new();
        assert_eq!(broker.raw_topics(), vec!["__consumer_offsets"]);
    }

    #[test]
    fn test_append_round_robins_partitions() {
        let broker = InMemoryBroker::new();
        broker.seed_topic("orders", 2);
        assert_eq!(broker.append("orders", "a"), (0, 0));
        assert_eq!(broker.append("orders", "b"), (1, 0));
        assert_eq!(broker.append("orders", "c"), (0, 1));
        assert_eq!(broker.message_count("orders"), 3);
    }

    #[tokio::test]
    async fn test_consumer_reads_from_beginning_after_resubscribe() {
        let broker = InMemoryBroker::new();
        broker.seed_topic("orders", 1);
        broker.append("orders", "first");

        let mut consumer = broker.consumer_identity().unwrap();
        consumer.connect().await.unwrap();
        consumer.subscribe(&["orders".to_string()]).await.unwrap();
        let msg = consumer.recv().await.unwrap();
        assert_eq!(msg.payload_lossy(), "first");

        consumer.subscribe(&["orders".to_string()]).await.unwrap();
        let msg = consumer.recv().await.unwrap();
        assert_eq!(msg.offset, 0);
    }

    #[tokio::test]
    async fn test_missing_topic_is_read_once_created() {
        let broker = InMemoryBroker::new();
        let mut consumer = broker.consumer_identity().unwrap();
        consumer.connect().await.unwrap();
        consumer.subscribe(&["audit".to_string()]).await.unwrap();

        broker.seed_topic("audit", 1);
        broker.append("audit", "late");
        let msg = consumer.recv().await.unwrap();
        assert_eq!((msg.offset, msg.payload_lossy()), (0, "late".to_string()));
    }

    #[tokio::test]
    async fn test_recv_faults_fire_once() {
        let broker = InMemoryBroker::new();
        broker.seed_topic("orders", 1);
        broker.append("orders", "kept");
        let mut consumer = broker.consumer_identity().unwrap();
        consumer.connect().await.unwrap();
        consumer.subscribe(&["orders".to_string()]).await.unwrap();

        broker.transient_recv_error();
        assert!(consumer.recv().await.unwrap_err().is_transient());
        assert_eq!(consumer.recv().await.unwrap().payload_lossy(), "kept");

        broker.fail_next_recv();
        assert!(!consumer.recv().await.unwrap_err().is_transient());
    }
}
