//! Broadcast hub fanning decoded status events out to every live client.
//!
//! # Architecture
//!
//! ```text
//!                 publish(event)
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │                  BroadcastHub                        │
//! │   client-a ──► [bounded queue] ──► send loop ──► ws  │
//! │   client-b ──► [bounded queue] ──► send loop ──► ws  │
//! │   client-c ──► [full........]  ✗ dropped for c only  │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Every client owns a bounded queue drained by its own send loop. Publishing
//! only ever uses `try_send`, so a slow or dead client costs the publisher a
//! failed enqueue and nothing more. A client whose queue stays full for
//! `max_consecutive_failures` publishes in a row is evicted; dropping its
//! sender ends its send loop, which closes the socket.
//!
//! # Ordering
//!
//! Each queue is FIFO and `publish` is called from the single listener task,
//! so a client sees events in publish order, minus any dropped for it.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::domain::machine::MachineStatusEvent;

/// Unique identifier for a client connection.
///
/// Generated server-side when a client registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Create a new random client ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tuning for per-client isolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubConfig {
    /// Capacity of each client's outbound queue.
    pub client_buffer: usize,

    /// Consecutive failed enqueues before a client is evicted.
    pub max_consecutive_failures: u32,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            client_buffer: 64,
            max_consecutive_failures: 3,
        }
    }
}

/// Handed to a connection on registration.
///
/// `receiver` yields events published after registration and returns
/// `None` once the hub evicts the client or shuts down.
#[derive(Debug)]
pub struct Registration {
    pub id: ClientId,
    pub receiver: mpsc::Receiver<Arc<MachineStatusEvent>>,
}

/// Outcome of one `publish`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub dropped: usize,
    pub evicted: usize,
}

struct ClientSlot {
    sender: mpsc::Sender<Arc<MachineStatusEvent>>,
    consecutive_failures: AtomicU32,
}

/// Registry of live client connections.
///
/// The registry is the only shared mutable state in the pipeline; all
/// access goes through `register`, `unregister`, `publish` and
/// `close_all`.
///
/// # Thread Safety
///
/// Uses `RwLock` for the registry since publishes (reads) vastly
/// outnumber registrations (writes). Failure counters are atomics so
/// publishing never needs the write lock unless it evicts.
pub struct BroadcastHub {
    clients: RwLock<HashMap<ClientId, ClientSlot>>,
    config: HubConfig,
    closed: AtomicBool,
}

impl BroadcastHub {
    /// Create a hub with the given per-client limits.
    ///
    /// A zero `client_buffer` is raised to 1; a zero failure threshold to 1.
    pub fn new(config: HubConfig) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            config: HubConfig {
                client_buffer: config.client_buffer.max(1),
                max_consecutive_failures: config.max_consecutive_failures.max(1),
            },
            closed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> HubConfig {
        self.config
    }

    /// Adds a client to the active set.
    ///
    /// The client receives only events published after this call. After
    /// `close_all` the returned receiver is already closed.
    pub async fn register(&self) -> Registration {
        let id = ClientId::new();
        let (sender, receiver) = mpsc::channel(self.config.client_buffer);

        let mut clients = self.clients.write().await;
        if self.closed.load(Ordering::Acquire) {
            tracing::debug!(client_id = %id, "Hub closed, refusing registration");
            return Registration { id, receiver };
        }
        clients.insert(
            id,
            ClientSlot {
                sender,
                consecutive_failures: AtomicU32::new(0),
            },
        );
        tracing::debug!(client_id = %id, clients = clients.len(), "Client registered");

        Registration { id, receiver }
    }

    /// Removes a client. Returns false if it was not registered.
    ///
    /// Idempotent; safe from the connection's own failure path and from
    /// eviction racing with it.
    pub async fn unregister(&self, id: &ClientId) -> bool {
        let removed = self.clients.write().await.remove(id).is_some();
        if removed {
            tracing::debug!(client_id = %id, "Client unregistered");
        }
        removed
    }

    /// Delivers an event to every registered client without waiting on any.
    pub async fn publish(&self, event: MachineStatusEvent) -> PublishReport {
        let event = Arc::new(event);
        let mut report = PublishReport::default();
        let mut evict = Vec::new();

        {
            let clients = self.clients.read().await;
            for (id, slot) in clients.iter() {
                match slot.sender.try_send(Arc::clone(&event)) {
                    Ok(()) => {
                        slot.consecutive_failures.store(0, Ordering::Relaxed);
                        report.delivered += 1;
                    }
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        report.dropped += 1;
                        let failures =
                            slot.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                        tracing::debug!(
                            client_id = %id,
                            failures,
                            machine = %event.machine_name,
                            "Client queue full, dropping event"
                        );
                        if failures >= self.config.max_consecutive_failures {
                            evict.push(*id);
                        }
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        report.dropped += 1;
                        evict.push(*id);
                    }
                }
            }
        }

        if !evict.is_empty() {
            let mut clients = self.clients.write().await;
            for id in &evict {
                if clients.remove(id).is_some() {
                    report.evicted += 1;
                    tracing::info!(client_id = %id, "Evicting client that cannot keep up");
                }
            }
        }

        tracing::trace!(
            machine = %event.machine_name,
            delivered = report.delivered,
            dropped = report.dropped,
            evicted = report.evicted,
            "Event published"
        );

        report
    }

    /// Drops every client and refuses new ones.
    ///
    /// Each connection notices its queue closing and shuts its socket down.
    pub async fn close_all(&self) {
        let mut clients = self.clients.write().await;
        self.closed.store(true, Ordering::Release);
        let count = clients.len();
        clients.clear();
        tracing::info!(clients = count, "Broadcast hub closed");
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_registered(&self, id: &ClientId) -> bool {
        self.clients.read().await.contains_key(id)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::machine::{ChangeDecoder, MachineStatus};
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc::error::TryRecvError;

    fn event(machine: &str, status: &str) -> MachineStatusEvent {
        let payload = json!({
            "operation": "UPDATE",
            "table": "machine_feed_stream",
            "timestamp": 1705276800,
            "new_data": {"machine_name": machine, "status": status},
            "old_data": {"machine_name": machine, "status": "operational"}
        })
        .to_string();
        ChangeDecoder::new("machine_feed_stream").decode(&payload).unwrap()
    }

    fn hub(client_buffer: usize, max_consecutive_failures: u32) -> BroadcastHub {
        BroadcastHub::new(HubConfig {
            client_buffer,
            max_consecutive_failures,
        })
    }

    #[tokio::test]
    async fn registered_clients_all_receive_event() {
        let hub = BroadcastHub::default();
        let mut a = hub.register().await;
        let mut b = hub.register().await;

        let report = hub.publish(event("Valve_02_01", "warning")).await;
        assert_eq!(report.delivered, 2);

        assert_eq!(a.receiver.recv().await.unwrap().machine_name, "Valve_02_01");
        assert_eq!(b.receiver.recv().await.unwrap().status, MachineStatus::Warning);
    }

    #[tokio::test]
    async fn late_registration_gets_no_backlog() {
        let hub = BroadcastHub::default();
        let mut early = hub.register().await;

        hub.publish(event("Valve_02_01", "warning")).await;
        let mut late = hub.register().await;
        hub.publish(event("Valve_02_01", "down")).await;

        assert_eq!(early.receiver.recv().await.unwrap().status, MachineStatus::Warning);
        assert_eq!(early.receiver.recv().await.unwrap().status, MachineStatus::Down);
        assert_eq!(late.receiver.recv().await.unwrap().status, MachineStatus::Down);
        assert!(matches!(late.receiver.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let hub = BroadcastHub::default();
        let mut client = hub.register().await;

        let statuses = ["warning", "down", "operational", "warning", "down"];
        for status in statuses {
            hub.publish(event("Painter_01_02", status)).await;
        }

        for status in statuses {
            let received = client.receiver.recv().await.unwrap();
            assert_eq!(received.status, MachineStatus::from(status));
        }
    }

    #[tokio::test]
    async fn stalled_client_does_not_block_others() {
        let hub = hub(2, 100);
        let _stalled = hub.register().await;
        let mut healthy = hub.register().await;

        for i in 0..20 {
            let report = tokio::time::timeout(
                Duration::from_millis(100),
                hub.publish(event(&format!("Sorter_0{}_01", i % 4), "down")),
            )
            .await
            .expect("publish must not block");
            assert!(report.delivered >= 1);
            assert!(healthy.receiver.recv().await.is_some());
        }
    }

    #[tokio::test]
    async fn client_is_evicted_after_consecutive_failures() {
        let hub = hub(1, 3);
        let mut slow = hub.register().await;

        // Fills the slow client's queue.
        hub.publish(event("Valve_01_01", "warning")).await;
        assert!(hub.is_registered(&slow.id).await);

        hub.publish(event("Valve_01_01", "down")).await;
        hub.publish(event("Valve_01_01", "operational")).await;
        assert!(hub.is_registered(&slow.id).await);

        let report = hub.publish(event("Valve_01_01", "warning")).await;
        assert_eq!(report.evicted, 1);
        assert!(!hub.is_registered(&slow.id).await);

        // Queued event is still readable, then the channel reports closed.
        assert!(slow.receiver.recv().await.is_some());
        assert!(slow.receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn successful_delivery_resets_failure_count() {
        let hub = hub(1, 2);
        let mut client = hub.register().await;

        hub.publish(event("Robotic_Arm_01_01", "warning")).await;
        hub.publish(event("Robotic_Arm_01_01", "down")).await; // failure 1
        client.receiver.recv().await.unwrap();

        hub.publish(event("Robotic_Arm_01_01", "operational")).await; // reset
        hub.publish(event("Robotic_Arm_01_01", "warning")).await; // failure 1
        assert!(hub.is_registered(&client.id).await);
    }

    #[tokio::test]
    async fn dropped_receiver_is_removed_on_next_publish() {
        let hub = BroadcastHub::default();
        let registration = hub.register().await;
        let id = registration.id;
        drop(registration);

        let report = hub.publish(event("Valve_03_01", "down")).await;
        assert_eq!(report.evicted, 1);
        assert!(!hub.is_registered(&id).await);
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let hub = BroadcastHub::default();
        let registration = hub.register().await;

        assert!(hub.unregister(&registration.id).await);
        assert!(!hub.unregister(&registration.id).await);
        assert_eq!(hub.client_count().await, 0);
    }

    #[tokio::test]
    async fn unregistered_client_receives_nothing_further() {
        let hub = BroadcastHub::default();
        let mut registration = hub.register().await;
        hub.unregister(&registration.id).await;

        hub.publish(event("Valve_03_01", "down")).await;
        assert!(registration.receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn close_all_ends_every_receiver_and_refuses_new_clients() {
        let hub = BroadcastHub::default();
        let mut a = hub.register().await;
        let mut b = hub.register().await;

        hub.close_all().await;
        assert!(hub.is_closed());
        assert_eq!(hub.client_count().await, 0);
        assert!(a.receiver.recv().await.is_none());
        assert!(b.receiver.recv().await.is_none());

        let mut late = hub.register().await;
        assert!(late.receiver.recv().await.is_none());
        assert_eq!(hub.client_count().await, 0);
    }

    #[tokio::test]
    async fn publish_with_no_clients_is_noop() {
        let hub = BroadcastHub::default();
        let report = hub.publish(event("Valve_03_01", "down")).await;
        assert_eq!(report, PublishReport::default());
    }

    #[test]
    fn client_id_display_is_uuid() {
        assert_eq!(ClientId::new().to_string().len(), 36);
    }
}
