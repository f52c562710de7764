//! Custom test assertions
//!
//! Domain-specific checks on the topic catalog.

use kafka_sessions::kafka::is_internal_topic;
use std::fmt;

/// Custom assertion error with detailed information
#[derive(Debug)]
pub struct AssertionError {
    pub message: String,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for AssertionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n  Expected: {}\n  Actual: {}",
            self.message, self.expected, self.actual
        )
    }
}

impl std::error::Error for AssertionError {}

impl AssertionError {
    pub fn new(
        message: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Assert that `topic` is in a listing
pub fn assert_topic_listed(topics: &[String], topic: &str) -> Result<(), AssertionError> {
    if topics.iter().any(|t| t == topic) {
        Ok(())
    } else {
        Err(AssertionError::new(
            "Topic missing from listing",
            format!("'{}' to be listed", topic),
            format!("{:?}", topics),
        ))
    }
}

/// Assert that `topic` is not in a listing
pub fn assert_topic_absent(topics: &[String], topic: &str) -> Result<(), AssertionError> {
    if topics.iter().any(|t| t == topic) {
        Err(AssertionError::new(
            "Topic still listed",
            format!("'{}' to be absent", topic),
            format!("{:?}", topics),
        ))
    } else {
        Ok(())
    }
}

/// Assert that no internal topic leaked into a listing
pub fn assert_no_internal_topics(topics: &[String]) -> Result<(), AssertionError> {
    match topics.iter().find(|t| is_internal_topic(t)) {
        Some(internal) => Err(AssertionError::new(
            "Internal topic visible",
            "no topic with the '__' prefix",
            internal.clone(),
        )),
        None => Ok(()),
    }
}
