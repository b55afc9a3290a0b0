//! PostgreSQL implementation of ChangeFeed.
//!
//! Each subscription opens its own `PgListener` and `LISTEN`s on the notify
//! channel. A lost connection ends the stream instead of reconnecting
//! silently, so the listener's backoff and liveness reporting stay in charge.

use async_trait::async_trait;
use sqlx::postgres::PgListener;
use sqlx::PgPool;

use crate::ports::{ChangeFeed, ChangeStream, FeedError};

/// PostgreSQL implementation of ChangeFeed.
#[derive(Clone)]
pub struct PgChangeFeed {
    pool: PgPool,
    channel: String,
}

impl PgChangeFeed {
    /// Creates a feed for `channel`, borrowing connections from `pool`.
    pub fn new(pool: PgPool, channel: impl Into<String>) -> Self {
        Self {
            pool,
            channel: channel.into(),
        }
    }
}

#[async_trait]
impl ChangeFeed for PgChangeFeed {
    async fn subscribe(&self) -> Result<Box<dyn ChangeStream>, FeedError> {
        let mut listener = PgListener::connect_with(&self.pool)
            .await
            .map_err(|e| FeedError::Connect(e.to_string()))?;

        listener
            .listen(&self.channel)
            .await
            .map_err(|e| FeedError::Listen {
                channel: self.channel.clone(),
                reason: e.to_string(),
            })?;

        tracing::debug!(channel = %self.channel, "LISTEN established");
        Ok(Box::new(PgChangeStream { listener }))
    }

    fn channel(&self) -> &str {
        &self.channel
    }
}

struct PgChangeStream {
    listener: PgListener,
}

#[async_trait]
impl ChangeStream for PgChangeStream {
    async fn next_payload(&mut self) -> Result<Option<String>, FeedError> {
        // `try_recv` yields `None` once when the connection is lost.
        match self.listener.try_recv().await {
            Ok(Some(notification)) => Ok(Some(notification.payload().to_string())),
            Ok(None) => Ok(None),
            Err(e) => Err(FeedError::Receive(e.to_string())),
        }
    }
}
