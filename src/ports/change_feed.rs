//! ChangeFeed port - Push subscription to the Status Store's change channel.
//!
//! A feed hands out streams; each stream is one live subscription yielding
//! the raw payload of every committed row change, in commit order. When the
//! underlying connection drops the stream ends and the caller subscribes
//! again.
//!
//! Delivery is at-most-once across reconnects: changes committed while no
//! stream is open are not replayed.

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a change feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Failed to connect to change channel: {0}")]
    Connect(String),

    #[error("Failed to listen on channel '{channel}': {reason}")]
    Listen { channel: String, reason: String },

    #[error("Change channel receive failed: {0}")]
    Receive(String),
}

/// One live subscription.
#[async_trait]
pub trait ChangeStream: Send {
    /// Waits for the next raw notification payload.
    ///
    /// Returns `Ok(None)` when the channel closed cleanly (network drop,
    /// store restart) and `Err` for receive failures. Either way the
    /// stream is finished.
    async fn next_payload(&mut self) -> Result<Option<String>, FeedError>;
}

/// Port for opening subscriptions.
///
/// # Example
///
/// ```ignore
/// let mut stream = feed.subscribe().await?;
/// while let Some(payload) = stream.next_payload().await? {
///     let event = decoder.decode(&payload)?;
///     hub.publish(event).await;
/// }
/// ```
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Opens a new subscription.
    async fn subscribe(&self) -> Result<Box<dyn ChangeStream>, FeedError>;

    /// Channel name, for logging.
    fn channel(&self) -> &str;
}
