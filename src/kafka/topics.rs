//! Topic registry
//!
//! Lists, creates and deletes topics through scoped admin sessions. Every
//! listing applies the internal-topic exclusion policy, so names such as
//! `__consumer_offsets` are never handed to callers.
//!
//! Delete operations are best-effort: they report success as a `bool` and
//! log the failure instead of raising it.

use std::sync::Arc;
use tracing::{error, info};

use super::constants::INTERNAL_TOPIC_PREFIX;
use super::error::{validate_topic_name, Result};
use super::session::{with_admin, BrokerConnector, TopicSpec};
use super::subscription::SubscriptionSet;

/// Whether `name` is a broker-internal topic
pub fn is_internal_topic(name: &str) -> bool {
    name.starts_with(INTERNAL_TOPIC_PREFIX)
}

/// Keep only user-visible topic names, preserving broker order
pub fn filter_user_topics<I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    names
        .into_iter()
        .filter(|name| !name.is_empty() && !is_internal_topic(name))
        .collect()
}

/// Fetch the user-visible topic catalog through a fresh admin session
pub async fn fetch_user_topics(connector: &dyn BrokerConnector) -> Result<Vec<String>> {
    let names = with_admin(connector, |admin| Box::pin(admin.list_topics())).await?;
    Ok(filter_user_topics(names))
}

/// Topic lifecycle operations
pub struct TopicRegistry {
    connector: Arc<dyn BrokerConnector>,
    partitions: i32,
    replication_factor: i32,
    /// Subscription set of the consumption orchestrator, kept in step with
    /// topic creation and deletion
    subscriptions: Option<SubscriptionSet>,
}

impl TopicRegistry {
    pub fn new(
        connector: Arc<dyn BrokerConnector>,
        partitions: i32,
        replication_factor: i32,
    ) -> Self {
        Self {
            connector,
            partitions,
            replication_factor,
            subscriptions: None,
        }
    }

    /// Register newly created topics with the orchestrator's subscription set
    pub fn with_subscriptions(mut self, subscriptions: SubscriptionSet) -> Self {
        self.subscriptions = Some(subscriptions);
        self
    }

    /// Create `name` with the configured partition count
    ///
    /// On success the topic joins the active subscription set so a running
    /// consumer starts reading it without a restart.
    ///
    /// # Errors
    ///
    /// - `Validation` if `name` is empty (no broker call is made)
    /// - `TopicExists` if the broker reports a conflict
    /// - `Connection` if the broker cannot be reached
    pub async fn create_topic(&self, name: &str) -> Result<()> {
        validate_topic_name(name)?;

        let new_topic = TopicSpec {
            name: name.to_string(),
            partitions: self.partitions,
            replication_factor: self.replication_factor,
        };

        with_admin(self.connector.as_ref(), |admin| {
            Box::pin(async move { admin.create_topic(&new_topic).await })
        })
        .await?;

        info!(topic = name, partitions = self.partitions, "Topic created");

        if let Some(subscriptions) = &self.subscriptions {
            if subscriptions.insert(name) {
                info!(topic = name, "Added topic to subscription");
            }
        }

        Ok(())
    }

    /// User-visible topic names in broker order
    pub async fn list_topics(&self) -> Result<Vec<String>> {
        fetch_user_topics(self.connector.as_ref()).await
    }

    /// Best-effort delete of a single topic
    ///
    /// Returns `true` if the broker accepted the delete, `false` otherwise.
    /// Never raises.
    pub async fn delete_topic(&self, name: &str) -> bool {
        let result = match validate_topic_name(name) {
            Ok(()) => {
                let names = vec![name.to_string()];
                with_admin(self.connector.as_ref(), |admin| {
                    Box::pin(async move { admin.delete_topics(&names).await })
                })
                .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                info!(topic = name, "Topic deleted");
                self.forget(std::iter::once(name));
                true
            }
            Err(e) => {
                error!(topic = name, error = %e, "Error deleting topic");
                false
            }
        }
    }

    /// Best-effort delete of every user-visible topic in one batch
    ///
    /// Internal topics are never part of the delete set. Returns `true` when
    /// there was nothing to delete.
    pub async fn delete_all_topics(&self) -> bool {
        let result: Result<Vec<String>> = with_admin(self.connector.as_ref(), |admin| {
            Box::pin(async move {
                let topics = filter_user_topics(admin.list_topics().await?);
                if !topics.is_empty() {
                    admin.delete_topics(&topics).await?;
                }
                Ok(topics)
            })
        })
        .await;

        match result {
            Ok(deleted) => {
                info!(count = deleted.len(), "All topics deleted");
                self.forget(deleted.iter().map(String::as_str));
                true
            }
            Err(e) => {
                error!(error = %e, "Error deleting topics");
                false
            }
        }
    }

    fn forget<'a>(&self, topics: impl IntoIterator<Item = &'a str>) {
        if let Some(subscriptions) = &self.subscriptions {
            for topic in topics {
                subscriptions.remove(topic);
            }
        }
    }
}
