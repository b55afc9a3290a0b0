//! In-memory change channel.
//!
//! Behaves like a notify channel with one listener connection: payloads
//! emitted while a subscription is open are delivered in order, payloads
//! emitted while none is open are lost.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::ports::{ChangeFeed, ChangeStream, FeedError};

#[derive(Default)]
struct FeedState {
    current: Option<mpsc::UnboundedSender<String>>,
    refuse: bool,
    subscriptions: usize,
    lost: usize,
}

/// In-memory [`ChangeFeed`] with controllable connection failures.
pub struct InMemoryChangeFeed {
    channel: String,
    state: Mutex<FeedState>,
}

impl InMemoryChangeFeed {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            state: Mutex::new(FeedState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sends a payload to the open subscription.
    ///
    /// Returns false when no subscription is listening; the payload is gone.
    pub fn emit(&self, payload: impl Into<String>) -> bool {
        let mut state = self.state();
        let delivered = match &state.current {
            Some(sender) => sender.send(payload.into()).is_ok(),
            None => false,
        };
        if !delivered {
            state.current = None;
            state.lost += 1;
        }
        delivered
    }

    /// Ends the open subscription as a network drop would.
    pub fn drop_connection(&self) {
        self.state().current = None;
    }

    /// Makes subsequent `subscribe` calls fail until cleared.
    pub fn refuse_subscriptions(&self, refuse: bool) {
        self.state().refuse = refuse;
    }

    /// Successful subscriptions so far.
    pub fn subscriptions(&self) -> usize {
        self.state().subscriptions
    }

    /// Payloads emitted with nobody listening.
    pub fn lost(&self) -> usize {
        self.state().lost
    }

    pub fn is_listening(&self) -> bool {
        self.state()
            .current
            .as_ref()
            .is_some_and(|sender| !sender.is_closed())
    }
}

#[async_trait]
impl ChangeFeed for InMemoryChangeFeed {
    async fn subscribe(&self) -> Result<Box<dyn ChangeStream>, FeedError> {
        let mut state = self.state();
        if state.refuse {
            return Err(FeedError::Connect("connection refused".into()));
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        state.current = Some(sender);
        state.subscriptions += 1;

        Ok(Box::new(InMemoryChangeStream { receiver }))
    }

    fn channel(&self) -> &str {
        &self.channel
    }
}

struct InMemoryChangeStream {
    receiver: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl ChangeStream for InMemoryChangeStream {
    async fn next_payload(&mut self) -> Result<Option<String>, FeedError> {
        Ok(self.receiver.recv().await)
    }
}
