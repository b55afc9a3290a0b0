//! ChangeListener - The single subscription feeding the broadcast hub.
//!
//! ## Loop
//!
//! 1. Subscribe to the change feed
//! 2. Decode each payload and publish it to the hub, in receipt order
//! 3. On channel loss, wait out the backoff and go back to 1
//!
//! A malformed payload is logged and dropped; it never ends the
//! subscription. Liveness is published through [`ListenerHealth`] so the
//! health endpoint can read it without touching the listener.
//!
//! ## Delivery
//!
//! At-most-once across reconnects. Changes committed while the channel is
//! down are not replayed; nothing already received is published twice.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::adapters::websocket::BroadcastHub;
use crate::domain::machine::ChangeDecoder;
use crate::ports::{ChangeFeed, ChangeStream, FeedError};

use super::backoff::{Backoff, BackoffPolicy};
use super::shutdown_requested;

/// Listener liveness as seen by the health surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Liveness {
    /// First subscription not yet established.
    Starting,
    /// Subscribed; events are flowing.
    Connected,
    /// Channel lost, retrying within the backoff window.
    Reconnecting,
    /// Still disconnected after the backoff reached its ceiling.
    Degraded,
    /// Listener has shut down.
    Stopped,
}

impl Liveness {
    pub fn is_live(&self) -> bool {
        matches!(self, Liveness::Connected)
    }
}

/// Shared view of the listener's state.
///
/// Cheap to clone; every clone observes the same listener.
#[derive(Debug, Clone)]
pub struct ListenerHealth {
    inner: Arc<HealthInner>,
}

#[derive(Debug)]
struct HealthInner {
    liveness: watch::Sender<Liveness>,
    published: AtomicU64,
    malformed: AtomicU64,
    reconnects: AtomicU64,
}

impl ListenerHealth {
    pub fn new() -> Self {
        let (liveness, _) = watch::channel(Liveness::Starting);
        Self {
            inner: Arc::new(HealthInner {
                liveness,
                published: AtomicU64::new(0),
                malformed: AtomicU64::new(0),
                reconnects: AtomicU64::new(0),
            }),
        }
    }

    pub fn liveness(&self) -> Liveness {
        *self.inner.liveness.borrow()
    }

    /// Receiver notified on every liveness change.
    pub fn watch(&self) -> watch::Receiver<Liveness> {
        self.inner.liveness.subscribe()
    }

    pub fn events_published(&self) -> u64 {
        self.inner.published.load(Ordering::Relaxed)
    }

    pub fn malformed_dropped(&self) -> u64 {
        self.inner.malformed.load(Ordering::Relaxed)
    }

    pub fn reconnects(&self) -> u64 {
        self.inner.reconnects.load(Ordering::Relaxed)
    }

    fn set(&self, liveness: Liveness) {
        self.inner.liveness.send_if_modified(|current| {
            if *current == liveness {
                false
            } else {
                *current = liveness;
                true
            }
        });
    }
}

impl Default for ListenerHealth {
    fn default() -> Self {
        Self::new()
    }
}

enum StreamEnd {
    Shutdown,
    Closed,
    Failed(FeedError),
}

/// Long-lived receive loop from the change feed into the hub.
pub struct ChangeListener {
    feed: Arc<dyn ChangeFeed>,
    decoder: ChangeDecoder,
    hub: Arc<BroadcastHub>,
    health: ListenerHealth,
    backoff: BackoffPolicy,
}

impl ChangeListener {
    pub fn new(
        feed: Arc<dyn ChangeFeed>,
        decoder: ChangeDecoder,
        hub: Arc<BroadcastHub>,
        health: ListenerHealth,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            feed,
            decoder,
            hub,
            health,
            backoff,
        }
    }

    pub fn health(&self) -> ListenerHealth {
        self.health.clone()
    }

    /// Run until the shutdown signal fires.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut backoff = Backoff::new(self.backoff);
        let mut ever_connected = false;

        loop {
            let subscribed = tokio::select! {
                _ = shutdown_requested(&mut shutdown) => break,
                result = self.feed.subscribe() => result,
            };

            match subscribed {
                Ok(mut stream) => {
                    if ever_connected {
                        self.health.inner.reconnects.fetch_add(1, Ordering::Relaxed);
                    }
                    ever_connected = true;
                    backoff.reset();
                    self.health.set(Liveness::Connected);
                    tracing::info!(channel = %self.feed.channel(), "Listening for status changes");

                    match self.pump(stream.as_mut(), &mut shutdown).await {
                        StreamEnd::Shutdown => break,
                        StreamEnd::Closed => {
                            tracing::warn!(channel = %self.feed.channel(), "Change channel closed");
                        }
                        StreamEnd::Failed(e) => {
                            tracing::warn!(
                                channel = %self.feed.channel(),
                                error = %e,
                                "Change channel failed"
                            );
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        channel = %self.feed.channel(),
                        attempt = backoff.attempts() + 1,
                        error = %e,
                        "Failed to subscribe to change channel"
                    );
                }
            }

            let delay = backoff.next_delay();
            if backoff.at_ceiling() {
                if self.health.liveness() != Liveness::Degraded {
                    tracing::error!(
                        channel = %self.feed.channel(),
                        attempts = backoff.attempts(),
                        "Change channel still down at backoff ceiling; reporting degraded"
                    );
                    self.health.set(Liveness::Degraded);
                }
            } else {
                self.health.set(Liveness::Reconnecting);
            }

            tracing::debug!(delay_ms = delay.as_millis() as u64, "Reconnecting after delay");
            tokio::select! {
                _ = shutdown_requested(&mut shutdown) => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.health.set(Liveness::Stopped);
        tracing::info!("Change listener stopped");
    }

    async fn pump(
        &self,
        stream: &mut dyn ChangeStream,
        shutdown: &mut watch::Receiver<bool>,
    ) -> StreamEnd {
        loop {
            let next = tokio::select! {
                _ = shutdown_requested(shutdown) => return StreamEnd::Shutdown,
                next = stream.next_payload() => next,
            };

            match next {
                Ok(Some(payload)) => self.dispatch(&payload).await,
                Ok(None) => return StreamEnd::Closed,
                Err(e) => return StreamEnd::Failed(e),
            }
        }
    }

    /// Decodes one payload and hands it to the hub.
    async fn dispatch(&self, payload: &str) {
        match self.decoder.decode(payload) {
            Ok(event) => {
                tracing::debug!(
                    machine = %event.machine_name,
                    status = %event.status,
                    operation = ?event.operation,
                    "Status change received"
                );
                self.hub.publish(event).await;
                self.health.inner.published.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.health.inner.malformed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "Dropping malformed change notification");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryChangeFeed;
    use crate::domain::machine::MachineStatus;
    use serde_json::json;
    use std::time::Duration;

    const TABLE: &str = "machine_feed_stream";

    fn payload(machine: &str, status: &str) -> String {
        json!({
            "operation": "UPDATE",
            "table": TABLE,
            "timestamp": 1705276800,
            "new_data": {"machine_name": machine, "status": status},
            "old_data": {"machine_name": machine, "status": "operational"}
        })
        .to_string()
    }

    fn fast_backoff() -> BackoffPolicy {
        BackoffPolicy {
            initial: Duration::from_millis(10),
            max: Duration::from_millis(40),
        }
    }

    fn listener(feed: Arc<InMemoryChangeFeed>, hub: Arc<BroadcastHub>) -> ChangeListener {
        ChangeListener::new(
            feed,
            ChangeDecoder::new(TABLE),
            hub,
            ListenerHealth::new(),
            fast_backoff(),
        )
    }

    async fn wait_for(health: &ListenerHealth, target: Liveness) {
        let mut rx = health.watch();
        tokio::time::timeout(Duration::from_secs(2), async {
            while *rx.borrow_and_update() != target {
                rx.changed().await.unwrap();
            }
        })
        .await
        .expect("liveness never reached target");
    }

    #[tokio::test]
    async fn malformed_payload_is_dropped_without_ending_subscription() {
        let feed = Arc::new(InMemoryChangeFeed::new("machine_feed_stream_changes"));
        let hub = Arc::new(BroadcastHub::default());
        let mut client = hub.register().await;
        let listener = Arc::new(listener(feed.clone(), hub.clone()));
        let health = listener.health();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn({
            let listener = listener.clone();
            async move { listener.run(shutdown_rx).await }
        });
        wait_for(&health, Liveness::Connected).await;

        feed.emit("{not json");
        feed.emit(payload("Valve_02_01", "warning"));

        let event = tokio::time::timeout(Duration::from_secs(1), client.receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.status, MachineStatus::Warning);
        assert_eq!(health.malformed_dropped(), 1);
        assert_eq!(health.events_published(), 1);
        assert_eq!(feed.subscriptions(), 1);

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
        assert_eq!(health.liveness(), Liveness::Stopped);
    }

    #[tokio::test]
    async fn resubscribes_after_channel_drop() {
        let feed = Arc::new(InMemoryChangeFeed::new("machine_feed_stream_changes"));
        let hub = Arc::new(BroadcastHub::default());
        let mut client = hub.register().await;
        let listener = Arc::new(listener(feed.clone(), hub.clone()));
        let health = listener.health();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn({
            let listener = listener.clone();
            async move { listener.run(shutdown_rx).await }
        });
        wait_for(&health, Liveness::Connected).await;

        feed.emit(payload("Valve_02_01", "warning"));
        let first = client.receiver.recv().await.unwrap();
        assert_eq!(first.status, MachineStatus::Warning);

        feed.drop_connection();
        tokio::time::timeout(Duration::from_secs(2), async {
            while feed.subscriptions() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("listener never resubscribed");

        feed.emit(payload("Valve_02_01", "down"));
        let second = client.receiver.recv().await.unwrap();
        assert_eq!(second.status, MachineStatus::Down);
        assert!(client.receiver.try_recv().is_err(), "no duplicate delivery");
        assert_eq!(feed.subscriptions(), 2);
        assert_eq!(health.reconnects(), 1);

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn reports_degraded_when_store_stays_down() {
        let feed = Arc::new(InMemoryChangeFeed::new("machine_feed_stream_changes"));
        feed.refuse_subscriptions(true);
        let hub = Arc::new(BroadcastHub::default());
        let listener = Arc::new(listener(feed.clone(), hub));
        let health = listener.health();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn({
            let listener = listener.clone();
            async move { listener.run(shutdown_rx).await }
        });
        wait_for(&health, Liveness::Degraded).await;
        assert!(!health.liveness().is_live());

        feed.refuse_subscriptions(false);
        wait_for(&health, Liveness::Connected).await;

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_while_backing_off_stops_promptly() {
        let feed = Arc::new(InMemoryChangeFeed::new("machine_feed_stream_changes"));
        feed.refuse_subscriptions(true);
        let listener = Arc::new(ChangeListener::new(
            feed,
            ChangeDecoder::new(TABLE),
            Arc::new(BroadcastHub::default()),
            ListenerHealth::new(),
            BackoffPolicy {
                initial: Duration::from_secs(30),
                max: Duration::from_secs(30),
            },
        ));
        let health = listener.health();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn({
            let listener = listener.clone();
            async move { listener.run(shutdown_rx).await }
        });
        wait_for(&health, Liveness::Degraded).await;

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("listener must stop without waiting out the backoff")
            .unwrap();
        assert_eq!(health.liveness(), Liveness::Stopped);
    }
}
