//! Consumer state machine
//!
//! The shared consumer identity moves through these states:
//! ```text
//! Idle → Subscribing → Running → Stopping → Idle
//!            ↑    │       │
//!            │    │       └─→ Subscribing   (subscription set changed)
//!            │    └─→ Stopping              (subscribe failed)
//! ```
//!
//! Only the holder of the consumer lease may move the machine, so transitions
//! are serialized by construction.

use std::fmt;

/// Where the shared consumer currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsumerState {
    /// Nobody holds the consumer; it is disconnected
    #[default]
    Idle,

    /// Connecting and (re)subscribing
    Subscribing,

    /// Receiving messages
    Running,

    /// Leaving the group and disconnecting
    Stopping,
}

impl ConsumerState {
    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(self, next: ConsumerState) -> bool {
        use ConsumerState::*;
        matches!(
            (self, next),
            (Idle, Subscribing)
                | (Subscribing, Running)
                | (Subscribing, Stopping)
                | (Running, Subscribing)
                | (Running, Stopping)
                | (Stopping, Idle)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsumerState::Idle => "idle",
            ConsumerState::Subscribing => "subscribing",
            ConsumerState::Running => "running",
            ConsumerState::Stopping => "stopping",
        }
    }
}

impl fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
