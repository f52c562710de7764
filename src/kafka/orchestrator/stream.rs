//! Lazy message stream over the shared consumer
//!
//! A `MessageStream` holds the consumer lease for as long as it lives. Messages
//! are pulled one at a time with [`MessageStream::next`]; the caller decides
//! when to stop. [`MessageStream::close`] disconnects and frees the identity.
//! Dropping the stream without closing disconnects in a background task; the
//! identity stays busy until that finishes.

use std::fmt;
use tokio::time::Instant;
use tracing::{info, warn};

use super::lease::ConsumerLease;
use super::CollectOptions;
use crate::kafka::error::Result;
use crate::kafka::session::Message;

pub struct MessageStream {
    /// `None` once the stream failed or was closed
    lease: Option<ConsumerLease>,
    topics: Vec<String>,
}

impl MessageStream {
    /// Subscribe the leased consumer to `topics` from the beginning of each log
    pub(super) async fn open(mut lease: ConsumerLease, topics: Vec<String>) -> Result<Self> {
        if let Err(e) = lease.start(&topics).await {
            lease.release().await;
            return Err(e);
        }

        Ok(Self {
            lease: Some(lease),
            topics,
        })
    }

    /// Topics this stream reads from
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// Wait for the next message
    ///
    /// Returns `None` once the stream has ended. Transient receive errors are
    /// logged and skipped; any other failure is returned once and ends the
    /// stream, releasing the consumer. Cancel-safe.
    pub async fn next(&mut self) -> Option<Result<Message>> {
        loop {
            let lease = self.lease.as_mut()?;
            match lease.recv().await {
                Ok(message) => return Some(Ok(message)),
                Err(e) if e.is_transient() => {
                    warn!(error = %e, topics = ?self.topics, "Skipping transient receive error");
                }
                Err(e) => {
                    if let Some(lease) = self.lease.take() {
                        lease.release().await;
                    }
                    return Some(Err(e));
                }
            }
        }
    }

    /// Disconnect and give the consumer identity back
    pub async fn close(mut self) {
        if let Some(lease) = self.lease.take() {
            lease.release().await;
        }
    }

    /// Pull messages until a stop condition in `options` is met, then close
    pub async fn collect(mut self, options: &CollectOptions) -> Result<Vec<Message>> {
        let mut messages = Vec::new();
        if options.limit == Some(0) {
            self.close().await;
            return Ok(messages);
        }

        if options.is_unbounded() {
            info!(topics = ?self.topics(), "Collecting with no stop condition");
        }

        let deadline = options.deadline.map(|d| Instant::now() + d);
        // A token nobody cancels stands in for "no cancellation".
        let cancel = options.cancel.clone().unwrap_or_default();

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                _ = sleep_until(deadline) => break,

                next = self.next() => match next {
                    Some(Ok(message)) => {
                        messages.push(message);
                        if options.limit.is_some_and(|limit| messages.len() >= limit) {
                            break;
                        }
                    }
                    Some(Err(e)) => return Err(e),
                    None => break,
                }
            }
        }

        self.close().await;
        Ok(messages)
    }
}

impl fmt::Debug for MessageStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageStream")
            .field("topics", &self.topics)
            .field("open", &self.lease.is_some())
            .finish()
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
