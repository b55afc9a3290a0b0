//! In-memory Status Store.
//!
//! Holds the latest row per machine and, when a feed is attached, emits the
//! same JSON notification a database trigger would for every insert,
//! update and delete. Notification order matches commit order.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::domain::foundation::Timestamp;
use crate::domain::machine::{
    ChangeNotification, ChangeOperation, FloorLayout, MachineStatus, MachineType,
};
use crate::ports::{StatusRecord, StatusStore, StoreError};

use super::InMemoryChangeFeed;

const DEFAULT_TABLE: &str = "machine_feed_stream";

#[derive(Debug, Clone)]
struct Row {
    status: MachineStatus,
    machine_type: String,
    updated_at: Timestamp,
}

/// In-memory [`StatusStore`] for tests and local runs.
pub struct InMemoryStatusStore {
    table: String,
    rows: Mutex<BTreeMap<String, Row>>,
    feed: Option<Arc<InMemoryChangeFeed>>,
    writes: AtomicU64,
    unavailable: AtomicBool,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            rows: Mutex::new(BTreeMap::new()),
            feed: None,
            writes: AtomicU64::new(0),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Seeds rows without emitting notifications.
    pub fn with_statuses<I, N>(statuses: I) -> Self
    where
        I: IntoIterator<Item = (N, MachineStatus)>,
        N: Into<String>,
    {
        let store = Self::new();
        let now = Timestamp::now();
        {
            let mut rows = store.rows();
            for (name, status) in statuses {
                let name = name.into();
                rows.insert(
                    name.clone(),
                    Row {
                        status,
                        machine_type: MachineType::from_machine_name(&name).to_string(),
                        updated_at: now,
                    },
                );
            }
        }
        store
    }

    /// One row per machine in the layout, all with `status`.
    pub fn from_layout(layout: &FloorLayout, status: MachineStatus) -> Self {
        Self::with_statuses(
            layout
                .machines()
                .map(|machine| (machine.name.clone(), status.clone())),
        )
    }

    /// Emits change notifications on `feed` from now on.
    pub fn with_feed(mut self, feed: Arc<InMemoryChangeFeed>) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    fn rows(&self) -> MutexGuard<'_, BTreeMap<String, Row>> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Makes reads and writes fail with `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Successful `write_status` calls.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn status_of(&self, machine_name: &str) -> Option<MachineStatus> {
        self.rows().get(machine_name).map(|row| row.status.clone())
    }

    /// Adds a machine row, emitting an INSERT.
    pub fn insert_machine(&self, machine_name: &str, status: MachineStatus) {
        let row = Row {
            status,
            machine_type: MachineType::from_machine_name(machine_name).to_string(),
            updated_at: Timestamp::now(),
        };
        let mut rows = self.rows();
        let old = rows.insert(machine_name.to_string(), row.clone());
        let operation = match old {
            Some(_) => ChangeOperation::Updated,
            None => ChangeOperation::Created,
        };
        self.notify(operation, machine_name, Some(&row), old.as_ref());
    }

    /// Removes a machine row, emitting a DELETE. Returns false if absent.
    pub fn delete_machine(&self, machine_name: &str) -> bool {
        let mut rows = self.rows();
        match rows.remove(machine_name) {
            Some(old) => {
                self.notify(ChangeOperation::Deleted, machine_name, None, Some(&old));
                true
            }
            None => false,
        }
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store offline".into()));
        }
        Ok(())
    }

    /// Runs under the rows lock so notification order follows commit order.
    fn notify(
        &self,
        operation: ChangeOperation,
        machine_name: &str,
        new_row: Option<&Row>,
        old_row: Option<&Row>,
    ) {
        let Some(feed) = &self.feed else {
            return;
        };

        let notification = ChangeNotification {
            operation: operation.as_trigger_op().to_string(),
            table: self.table.clone(),
            timestamp: epoch_secs(&Timestamp::now()),
            new_data: new_row.map(|row| snapshot(machine_name, row)),
            old_data: old_row.map(|row| snapshot(machine_name, row)),
        };

        match serde_json::to_string(&notification) {
            Ok(payload) => {
                feed.emit(payload);
            }
            Err(e) => tracing::warn!(error = %e, "Failed to encode change notification"),
        }
    }
}

impl Default for InMemoryStatusStore {
    fn default() -> Self {
        Self::new()
    }
}

fn epoch_secs(at: &Timestamp) -> f64 {
    at.as_datetime().timestamp_micros() as f64 / 1_000_000.0
}

fn snapshot(machine_name: &str, row: &Row) -> Map<String, Value> {
    let value = json!({
        "machine_name": machine_name,
        "status": row.status.as_str(),
        "type": row.machine_type,
        "datetime": row.updated_at.to_rfc3339(),
    });
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[async_trait]
impl StatusStore for InMemoryStatusStore {
    async fn latest_statuses(&self) -> Result<HashMap<String, StatusRecord>, StoreError> {
        self.check_available()?;
        Ok(self
            .rows()
            .iter()
            .map(|(name, row)| {
                (
                    name.clone(),
                    StatusRecord {
                        status: row.status.clone(),
                        machine_type: Some(row.machine_type.clone()),
                        updated_at: Some(row.updated_at),
                    },
                )
            })
            .collect())
    }

    async fn write_status(
        &self,
        machine_name: &str,
        status: &MachineStatus,
        at: Timestamp,
    ) -> Result<(), StoreError> {
        self.check_available()?;

        let mut rows = self.rows();
        let row = rows
            .get_mut(machine_name)
            .ok_or_else(|| StoreError::UnknownMachine(machine_name.to_string()))?;

        let old = row.clone();
        row.status = status.clone();
        row.updated_at = at;
        let new = row.clone();
        self.writes.fetch_add(1, Ordering::SeqCst);

        self.notify(ChangeOperation::Updated, machine_name, Some(&new), Some(&old));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::machine::ChangeDecoder;

    fn store_with_feed() -> (InMemoryStatusStore, Arc<InMemoryChangeFeed>) {
        let feed = Arc::new(InMemoryChangeFeed::new("machine_feed_stream_changes"));
        let store = InMemoryStatusStore::with_statuses([("Valve_02_01", MachineStatus::Operational)])
            .with_feed(feed.clone());
        (store, feed)
    }

    #[tokio::test]
    async fn write_emits_decodable_update() {
        use crate::ports::ChangeFeed;

        let (store, feed) = store_with_feed();
        let mut stream = feed.subscribe().await.unwrap();

        store
            .write_status("Valve_02_01", &MachineStatus::Warning, Timestamp::now())
            .await
            .unwrap();

        let payload = stream.next_payload().await.unwrap().unwrap();
        let event = ChangeDecoder::new(DEFAULT_TABLE).decode(&payload).unwrap();
        assert_eq!(event.operation, ChangeOperation::Updated);
        assert_eq!(event.status, MachineStatus::Warning);
        assert_eq!(event.previous_status, Some(MachineStatus::Operational));
    }

    #[tokio::test]
    async fn insert_and_delete_emit_matching_operations() {
        use crate::ports::ChangeFeed;

        let (store, feed) = store_with_feed();
        let mut stream = feed.subscribe().await.unwrap();
        let decoder = ChangeDecoder::new(DEFAULT_TABLE);

        store.insert_machine("Sorter_05_01", MachineStatus::Down);
        assert!(store.delete_machine("Sorter_05_01"));
        assert!(!store.delete_machine("Sorter_05_01"));

        let inserted = decoder
            .decode(&stream.next_payload().await.unwrap().unwrap())
            .unwrap();
        assert_eq!(inserted.operation, ChangeOperation::Created);
        assert_eq!(inserted.previous_status, None);

        let deleted = decoder
            .decode(&stream.next_payload().await.unwrap().unwrap())
            .unwrap();
        assert_eq!(deleted.operation, ChangeOperation::Deleted);
        assert_eq!(deleted.machine_name, "Sorter_05_01");
        assert_eq!(deleted.status, MachineStatus::Down);
    }

    #[tokio::test]
    async fn unknown_machine_write_is_rejected() {
        let store = InMemoryStatusStore::new();
        let err = store
            .write_status("Robotic Arm_09_09", &MachineStatus::Down, Timestamp::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownMachine(_)));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn unavailable_store_fails_reads() {
        let store = InMemoryStatusStore::from_layout(
            &FloorLayout::default_floor(),
            MachineStatus::Operational,
        );
        assert_eq!(store.latest_statuses().await.unwrap().len(), 30);

        store.set_unavailable(true);
        assert!(matches!(
            store.latest_statuses().await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
