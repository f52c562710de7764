//! Consumption orchestrator
//!
//! Owns the single consumer group identity shared by the whole process and
//! drives every consumption activity through one serialized state machine.
//!
//! # Activities
//!
//! - **Background consumption**: started once at process start, subscribes to
//!   every user topic and logs each message until cancelled or until a
//!   receive fails for good. Transient receive errors are logged and skipped.
//! - **Streaming**: subscribes to one topic (or all of them) and hands out
//!   messages one at a time until the caller closes the stream.
//! - **Collection**: a stream drained until a caller-supplied condition, then
//!   closed.
//!
//! Only one activity holds the identity at a time. A second one is rejected
//! with `ConsumerBusy` instead of being allowed to resubscribe the consumer
//! underneath the first.
//!
//! # Subscription set
//!
//! Topics followed by the background consumer live in a [`SubscriptionSet`]
//! separate from the connection. Adding a topic bumps the set's version; the
//! run loop notices and resubscribes to the complete set.

mod lease;
mod state;
mod stream;


pub use state::ConsumerState;
pub use stream::MessageStream;

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use self::lease::ConsumerLease;
use super::error::{validate_topic_name, Result, SessionError};
use super::session::{BrokerConnector, ConsumerSession};
use super::subscription::SubscriptionSet;
use super::topics::fetch_user_topics;

/// When a collection stops
///
/// Without any condition a collection runs until the process ends, because
/// the broker never signals the end of a log.
#[derive(Debug, Clone, Default)]
pub struct CollectOptions {
    /// Stop after this many messages
    pub limit: Option<usize>,
    /// Stop once this much time has passed since the subscription was made
    pub deadline: Option<Duration>,
    /// Stop when this token is cancelled
    pub cancel: Option<CancellationToken>,
}

impl CollectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn is_unbounded(&self) -> bool {
        self.limit.is_none() && self.deadline.is_none() && self.cancel.is_none()
    }
}

/// A collected payload tagged with the topic it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedPayload {
    pub topic: String,
    pub payload: Bytes,
}

pub struct ConsumptionOrchestrator {
    connector: Arc<dyn BrokerConnector>,
    consumer: Arc<Mutex<Box<dyn ConsumerSession>>>,
    state: Arc<watch::Sender<ConsumerState>>,
    subscriptions: SubscriptionSet,
}

impl ConsumptionOrchestrator {
    /// Take the connector's shared consumer identity. No connection is made.
    pub fn new(connector: Arc<dyn BrokerConnector>) -> Result<Self> {
        let consumer = connector.consumer_identity()?;
        let (state, _) = watch::channel(ConsumerState::Idle);

        Ok(Self {
            connector,
            consumer: Arc::new(Mutex::new(consumer)),
            state: Arc::new(state),
            subscriptions: SubscriptionSet::new(),
        })
    }

    pub fn state(&self) -> ConsumerState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition
    pub fn watch_state(&self) -> watch::Receiver<ConsumerState> {
        self.state.subscribe()
    }

    /// Topics the background consumer follows
    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.snapshot()
    }

    /// Shared handle to the subscription set, for the topic registry
    pub fn subscription_set(&self) -> SubscriptionSet {
        self.subscriptions.clone()
    }

    /// Add `name` to the accumulated subscription set
    ///
    /// A running background consumer resubscribes to the full set, existing
    /// topics included. When idle the topic is picked up on the next start.
    /// Returns false if the topic was already followed or is internal.
    pub fn add_topic(&self, name: &str) -> Result<bool> {
        validate_topic_name(name)?;
        let added = self.subscriptions.insert(name);
        if added {
            info!(topic = name, state = %self.state(), "Added topic to subscription");
        }
        Ok(added)
    }

    fn acquire(&self) -> Result<ConsumerLease> {
        match self.consumer.clone().try_lock_owned() {
            Ok(guard) => Ok(ConsumerLease::new(guard, self.state.clone())),
            Err(_) => Err(SessionError::ConsumerBusy {
                state: self.state(),
            }),
        }
    }

    /// Start the permanent background consumer
    ///
    /// Discovers every user topic, merges it into the subscription set,
    /// subscribes from the beginning of each log and spawns the receive loop.
    /// Any failure up to that point is returned and leaves the consumer idle.
    /// Failures inside the loop are only logged. A transient one is skipped;
    /// anything else stops the loop and the consumer goes back to idle.
    ///
    /// The loop ends when `cancel` fires.
    pub async fn start_background_consumption(
        &self,
        cancel: CancellationToken,
    ) -> Result<JoinHandle<()>> {
        let mut lease = self.acquire()?;

        let discovered = match fetch_user_topics(self.connector.as_ref()).await {
            Ok(topics) => topics,
            Err(e) => {
                error!(error = %e, "Error discovering topics for consumer");
                lease.release().await;
                return Err(e);
            }
        };
        info!(topics = ?discovered, "Discovered topics");
        self.subscriptions.extend(&discovered);

        // Register for changes before taking the snapshot so nothing added in
        // between is missed.
        let changes = self.subscriptions.watch();
        let topics = self.subscriptions.snapshot();

        if let Err(e) = lease.start(&topics).await {
            error!(error = %e, "Error running consumer");
            lease.release().await;
            return Err(e);
        }

        let task = run_background(lease, self.subscriptions.clone(), changes, cancel);
        Ok(tokio::spawn(
            task.instrument(info_span!("background_consumer")),
        ))
    }

    /// Open a stream over `name` alone, starting at the beginning of its log
    pub async fn stream_topic(&self, name: &str) -> Result<MessageStream> {
        validate_topic_name(name)?;
        let lease = self.acquire()?;
        MessageStream::open(lease, vec![name.to_string()]).await
    }

    /// Open a stream over every user topic
    ///
    /// Returns `None` when there are no user topics; the consumer is not
    /// touched in that case.
    pub async fn stream_all_topics(&self) -> Result<Option<MessageStream>> {
        let lease = self.acquire()?;

        let topics = match fetch_user_topics(self.connector.as_ref()).await {
            Ok(topics) => topics,
            Err(e) => {
                lease.release().await;
                return Err(e);
            }
        };

        if topics.is_empty() {
            lease.release().await;
            return Ok(None);
        }

        MessageStream::open(lease, topics).await.map(Some)
    }

    /// Read payloads from `name` alone, starting at the beginning of its log
    ///
    /// Absent payloads are returned as empty bytes.
    pub async fn collect_from_topic(
        &self,
        name: &str,
        options: CollectOptions,
    ) -> Result<Vec<Bytes>> {
        let stream = self.stream_topic(name).await?;
        let messages = stream.collect(&options).await?;
        Ok(messages
            .into_iter()
            .map(|m| m.payload.unwrap_or_default())
            .collect())
    }

    /// Read payloads from every user topic, tagging each with its source
    ///
    /// Returns immediately with nothing when there are no user topics.
    pub async fn collect_from_all_topics(
        &self,
        options: CollectOptions,
    ) -> Result<Vec<TaggedPayload>> {
        let Some(stream) = self.stream_all_topics().await? else {
            return Ok(Vec::new());
        };

        let messages = stream.collect(&options).await?;
        Ok(messages
            .into_iter()
            .map(|m| TaggedPayload {
                topic: m.topic,
                payload: m.payload.unwrap_or_default(),
            })
            .collect())
    }
}

/// Background receive loop. Owns the lease until it exits.
async fn run_background(
    mut lease: ConsumerLease,
    subscriptions: SubscriptionSet,
    mut changes: watch::Receiver<u64>,
    cancel: CancellationToken,
) {
    info!(topics = ?subscriptions.snapshot(), "Consumer running");

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                info!("Consumer stop requested");
                break;
            }

            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let topics = subscriptions.snapshot();
                info!(topics = ?topics, "Subscription set changed, resubscribing");
                if let Err(e) = lease.resubscribe(&topics).await {
                    error!(error = %e, "Error resubscribing consumer, abandoning consumption");
                    break;
                }
            }

            received = lease.recv() => match received {
                Ok(message) => {
                    info!(
                        topic = %message.topic,
                        partition = message.partition,
                        offset = message.offset,
                        value = %message.payload_lossy(),
                        "Received message"
                    );
                }
                Err(e) if e.is_transient() => {
                    warn!(error = %e, "Consumer reported a transient error, continuing");
                }
                Err(e) => {
                    error!(error = %e, "Error running consumer, abandoning consumption");
                    break;
                }
            }
        }
    }

    lease.release().await;
    info!("Consumer stopped");
}
