//! Message publisher
//!
//! Sends one message per call through a scoped producer session. The session
//! is closed on every exit path, including a failed send, before the result
//! is handed back.

use std::sync::Arc;
use tracing::{debug, error};

use super::error::{validate_topic_name, Result};
use super::session::{with_producer, BrokerConnector, DeliveryReport};

pub struct Publisher {
    connector: Arc<dyn BrokerConnector>,
}

impl Publisher {
    pub fn new(connector: Arc<dyn BrokerConnector>) -> Self {
        Self { connector }
    }

    /// Publish `payload` to `topic`
    ///
    /// An absent payload is sent as a null value.
    ///
    /// # Errors
    ///
    /// - `Validation` if `topic` is empty (no session is opened)
    /// - `Connection` if the producer session cannot be opened
    /// - `Publish` if the broker does not acknowledge the message
    pub async fn publish(&self, topic: &str, payload: Option<&[u8]>) -> Result<DeliveryReport> {
        validate_topic_name(topic)?;

        let target = topic.to_string();
        let payload = payload.map(<[u8]>::to_vec);
        let result = with_producer(self.connector.as_ref(), |producer| {
            Box::pin(async move { producer.send(&target, payload.as_deref()).await })
        })
        .await;

        match &result {
            Ok(report) => debug!(
                topic = %report.topic,
                partition = report.partition,
                offset = report.offset,
                "Message sent successfully"
            ),
            Err(e) => error!(topic, error = %e, "Error producing message"),
        }

        result
    }
}
