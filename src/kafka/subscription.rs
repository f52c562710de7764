//! Accumulated subscription set
//!
//! The set of topics the background consumer follows is kept here, apart from
//! the live consumer connection. Every (re)subscribe replays the whole set, so
//! adding a topic never drops the ones already followed.
//!
//! Each mutation bumps a version published on a `watch` channel. The run loop
//! holds a receiver and resubscribes when the version moves.

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::watch;

use super::topics::is_internal_topic;

/// Cloneable handle to the shared subscription set
#[derive(Clone, Debug)]
pub struct SubscriptionSet {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    /// Topics in the order they were first added
    topics: RwLock<Vec<String>>,
    version: watch::Sender<u64>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                topics: RwLock::new(Vec::new()),
                version,
            }),
        }
    }

    /// Add a topic. Returns true if it was not already present.
    ///
    /// Internal topics are never admitted.
    pub fn insert(&self, topic: &str) -> bool {
        self.extend([topic]) == 1
    }

    /// Add several topics at once, publishing a single change.
    /// Returns how many were new.
    pub fn extend<I, S>(&self, topics: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let added = {
            let mut current = self.inner.topics.write();
            let mut added = 0;
            for topic in topics {
                let topic = topic.as_ref();
                if topic.is_empty() || is_internal_topic(topic) {
                    continue;
                }
                if !current.iter().any(|t| t == topic) {
                    current.push(topic.to_string());
                    added += 1;
                }
            }
            added
        };

        if added > 0 {
            self.bump();
        }
        added
    }

    /// Drop a topic (used when it is deleted from the broker)
    pub fn remove(&self, topic: &str) -> bool {
        let removed = {
            let mut current = self.inner.topics.write();
            let before = current.len();
            current.retain(|t| t != topic);
            current.len() != before
        };

        if removed {
            self.bump();
        }
        removed
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.inner.topics.read().clone()
    }

    /// Receiver that wakes whenever the set changes
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.inner.version.subscribe()
    }

    fn bump(&self) {
        self.inner.version.send_modify(|v| *v += 1);
    }
}

impl Default for SubscriptionSet {
    fn default() -> Self {
        Self::new()
    }
}
