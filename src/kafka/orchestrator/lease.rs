//! Exclusive ownership of the shared consumer
//!
//! A `ConsumerLease` wraps the mutex guard over the consumer session together
//! with the state channel. Every state transition goes through the lease, so
//! the state machine can only be driven by whoever holds the identity.
//!
//! A lease dropped without [`ConsumerLease::release`] (an aborted task, a
//! collect future dropped by an outer timeout) hands its guard to a cleanup
//! task. The consumer reads `stopping` and stays locked until that task has
//! disconnected it.

use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{watch, OwnedMutexGuard};
use tracing::{debug, warn, Instrument};

use super::state::ConsumerState;
use crate::kafka::error::{Result, SessionError};
use crate::kafka::session::{ConsumerSession, Message};

type SessionGuard = OwnedMutexGuard<Box<dyn ConsumerSession>>;

pub(crate) struct ConsumerLease {
    /// `None` only once `Drop` has moved the guard into its cleanup task
    session: Option<SessionGuard>,
    state: Arc<watch::Sender<ConsumerState>>,
}

impl ConsumerLease {
    pub(crate) fn new(session: SessionGuard, state: Arc<watch::Sender<ConsumerState>>) -> Self {
        Self {
            session: Some(session),
            state,
        }
    }

    pub(crate) fn state(&self) -> ConsumerState {
        *self.state.borrow()
    }

    fn session(&mut self) -> Result<&mut Box<dyn ConsumerSession>> {
        self.session
            .as_deref_mut()
            .ok_or_else(|| SessionError::Internal("consumer lease already released".to_string()))
    }

    fn transition(&self, next: ConsumerState) -> Result<()> {
        let current = self.state();
        if !current.can_transition_to(next) {
            return Err(SessionError::InvalidTransition {
                from: current,
                to: next,
            });
        }
        debug!(from = %current, to = %next, "Consumer state transition");
        self.state.send_replace(next);
        Ok(())
    }

    /// Idle → Subscribing → Running: connect and subscribe to `topics`
    ///
    /// On failure the lease is left in `Stopping`; callers must `release`.
    pub(crate) async fn start(&mut self, topics: &[String]) -> Result<()> {
        self.transition(ConsumerState::Subscribing)?;
        let subscribed = self.connect_and_subscribe(topics).await;
        self.settle(subscribed)
    }

    async fn connect_and_subscribe(&mut self, topics: &[String]) -> Result<()> {
        let session = self.session()?;
        session.connect().await?;
        session.subscribe(topics).await
    }

    /// Running → Subscribing → Running: replace the subscription with `topics`
    pub(crate) async fn resubscribe(&mut self, topics: &[String]) -> Result<()> {
        self.transition(ConsumerState::Subscribing)?;
        let subscribed = match self.session() {
            Ok(session) => session.subscribe(topics).await,
            Err(e) => Err(e),
        };
        self.settle(subscribed)
    }

    fn settle(&mut self, subscribed: Result<()>) -> Result<()> {
        match subscribed {
            Ok(()) => self.transition(ConsumerState::Running),
            Err(e) => {
                self.transition(ConsumerState::Stopping)?;
                Err(e)
            }
        }
    }

    pub(crate) async fn recv(&mut self) -> Result<Message> {
        self.session()?.recv().await
    }

    /// → Stopping → Idle: disconnect and give the identity back
    ///
    /// A lease that never left `Idle` has nothing to disconnect.
    pub(crate) async fn release(mut self) {
        match self.state() {
            ConsumerState::Idle => return,
            ConsumerState::Stopping => {}
            ConsumerState::Subscribing | ConsumerState::Running => {
                if let Err(e) = self.transition(ConsumerState::Stopping) {
                    warn!(error = %e, "Releasing consumer from unexpected state");
                    self.state.send_replace(ConsumerState::Stopping);
                }
            }
        }

        if let Some(session) = self.session.as_deref_mut() {
            if let Err(e) = session.disconnect().await {
                warn!(error = %e, "Failed to disconnect consumer");
            }
        }

        // Stopping → Idle is always legal; the guard drops right after.
        self.state.send_replace(ConsumerState::Idle);
    }
}

impl Drop for ConsumerLease {
    fn drop(&mut self) {
        let state = self.state();
        if state == ConsumerState::Idle {
            return;
        }
        let Some(mut session) = self.session.take() else {
            return;
        };

        warn!(state = %state, "Consumer lease dropped without release, disconnecting");
        self.state.send_replace(ConsumerState::Stopping);
        let states = Arc::clone(&self.state);

        match Handle::try_current() {
            Ok(runtime) => {
                let cleanup = async move {
                    if let Err(e) = session.disconnect().await {
                        warn!(error = %e, "Failed to disconnect consumer");
                    }
                    states.send_replace(ConsumerState::Idle);
                    drop(session);
                };
                runtime.spawn(cleanup.in_current_span());
            }
            // No runtime left to disconnect on: the process is going down.
            Err(_) => {
                states.send_replace(ConsumerState::Idle);
            }
        }
    }
}
