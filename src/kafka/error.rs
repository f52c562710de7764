//! Session layer error types
//!
//! One error enum covers every broker interaction. Administrative and publish
//! failures propagate to the caller; delete operations fold failures into a
//! boolean instead, and the background consumer only logs them.

use thiserror::Error;

use super::orchestrator::ConsumerState;

/// Errors that can occur while talking to the broker
#[derive(Error, Debug)]
pub enum SessionError {
    /// Broker unreachable or the connection could not be established
    #[error("Connection error: {0}")]
    Connection(String),

    /// Required input missing or malformed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Topic creation conflicted with an existing topic
    #[error("Topic already exists: {0}")]
    TopicExists(String),

    /// Topic does not exist
    #[error("Topic not found: {0}")]
    TopicNotFound(String),

    /// Broker rejected an administrative request for another reason
    #[error("Admin error: {0}")]
    Admin(String),

    /// Message could not be delivered
    #[error("Failed to publish to {topic}: {reason}")]
    Publish { topic: String, reason: String },

    /// Failure inside a receive loop; the consumer cannot carry on
    #[error("Consumption error: {0}")]
    Consumption(String),

    /// Receive reported a per-topic or per-partition problem (a subscribed
    /// topic not available yet, a partition leader moving). The consumer
    /// itself is still usable.
    #[error("Transient consumption error: {0}")]
    TransientConsumption(String),

    /// The shared consumer identity is held by another activity
    #[error("Consumer is busy (state: {state})")]
    ConsumerBusy { state: ConsumerState },

    /// Consumer state machine asked to make an illegal move
    #[error("Invalid consumer transition: {from} -> {to}")]
    InvalidTransition {
        from: ConsumerState,
        to: ConsumerState,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal failure (blocking task panicked or was cancelled)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SessionError {
    pub fn connection(message: impl Into<String>) -> Self {
        SessionError::Connection(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        SessionError::Validation(message.into())
    }

    pub fn consumption(message: impl Into<String>) -> Self {
        SessionError::Consumption(message.into())
    }

    pub fn transient_consumption(message: impl Into<String>) -> Self {
        SessionError::TransientConsumption(message.into())
    }

    pub fn publish(topic: impl Into<String>, reason: impl ToString) -> Self {
        SessionError::Publish {
            topic: topic.into(),
            reason: reason.to_string(),
        }
    }

    /// Status code the HTTP front end should answer with
    ///
    /// Missing or malformed input is the caller's fault (400); everything
    /// else is an internal failure (500).
    pub fn http_status(&self) -> u16 {
        match self {
            SessionError::Validation(_) => 400,
            SessionError::Connection(_)
            | SessionError::TopicExists(_)
            | SessionError::TopicNotFound(_)
            | SessionError::Admin(_)
            | SessionError::Publish { .. }
            | SessionError::Consumption(_)
            | SessionError::TransientConsumption(_)
            | SessionError::ConsumerBusy { .. }
            | SessionError::InvalidTransition { .. }
            | SessionError::InvalidConfig(_)
            | SessionError::Internal(_) => 500,
        }
    }

    pub fn is_connection_error(&self) -> bool {
        matches!(self, SessionError::Connection(_))
    }

    /// Whether a receive loop may log this error and keep going
    pub fn is_transient(&self) -> bool {
        matches!(self, SessionError::TransientConsumption(_))
    }
}

impl From<tokio::task::JoinError> for SessionError {
    fn from(err: tokio::task::JoinError) -> Self {
        SessionError::Internal(format!("Blocking task failed: {}", err))
    }
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Reject empty or whitespace-only topic names
pub fn validate_topic_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(SessionError::validation("Topic name is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SessionError::TopicExists("orders".to_string());
        assert_eq!(err.to_string(), "Topic already exists: orders");

        let err = SessionError::publish("orders", "broker down");
        assert_eq!(err.to_string(), "Failed to publish to orders: broker down");
    }

    #[test]
    fn test_consumer_busy_display() {
        let err = SessionError::ConsumerBusy {
            state: ConsumerState::Running,
        };
        assert_eq!(err.to_string(), "Consumer is busy (state: running)");
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(SessionError::validation("missing").http_status(), 400);
        assert_eq!(SessionError::connection("refused").http_status(), 500);
        assert_eq!(SessionError::publish("t", "e").http_status(), 500);
        assert_eq!(
            SessionError::TopicExists("t".to_string()).http_status(),
            500
        );
    }

    #[test]
    fn test_validate_topic_name() {
        assert!(validate_topic_name("orders").is_ok());
        assert!(matches!(
            validate_topic_name(""),
            Err(SessionError::Validation(_))
        ));
        assert!(matches!(
            validate_topic_name("   "),
            Err(SessionError::Validation(_))
        ));
    }

    #[test]
    fn test_is_transient() {
        assert!(SessionError::transient_consumption("Unknown topic").is_transient());
        assert!(!SessionError::consumption("consumer closed").is_transient());
        assert!(!SessionError::connection("refused").is_transient());
        assert_eq!(
            SessionError::transient_consumption("x").http_status(),
            500
        );
    }

    #[test]
    fn test_is_connection_error() {
        assert!(SessionError::connection("x").is_connection_error());
        assert!(!SessionError::consumption("x").is_connection_error());
    }
}
