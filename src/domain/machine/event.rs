//! Change notifications from the Status Store and the typed events
//! decoded from them.
//!
//! # Wire Shape
//!
//! The notify trigger emits one JSON document per committed row change:
//!
//! ```json
//! {
//!   "operation": "UPDATE",
//!   "table": "machine_feed_stream",
//!   "timestamp": 1705276800.123,
//!   "new_data": { "machine_name": "Valve_02_01", "status": "warning", ... },
//!   "old_data": { "machine_name": "Valve_02_01", "status": "operational", ... }
//! }
//! ```
//!
//! `new_data` is omitted for deletes, `old_data` for inserts. The same
//! document is what clients receive, so the original text is kept alongside
//! the decoded fields.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::foundation::Timestamp;

use super::MachineStatus;

/// Kind of row change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeOperation {
    Created,
    Updated,
    Deleted,
}

impl ChangeOperation {
    /// Parses the trigger's `TG_OP` value.
    pub fn from_trigger_op(op: &str) -> Option<Self> {
        match op {
            "INSERT" => Some(ChangeOperation::Created),
            "UPDATE" => Some(ChangeOperation::Updated),
            "DELETE" => Some(ChangeOperation::Deleted),
            _ => None,
        }
    }

    pub fn as_trigger_op(&self) -> &'static str {
        match self {
            ChangeOperation::Created => "INSERT",
            ChangeOperation::Updated => "UPDATE",
            ChangeOperation::Deleted => "DELETE",
        }
    }
}

/// Raw notification document, as emitted by the trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeNotification {
    pub operation: String,
    pub table: String,
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_data: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_data: Option<Map<String, Value>>,
}

/// Reasons a notification payload is rejected.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Payload is not a valid change notification: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("Notification for table '{actual}', expected '{expected}'")]
    UnexpectedTable { expected: String, actual: String },

    #[error("{operation:?} notification is missing its {snapshot} snapshot")]
    MissingSnapshot {
        operation: ChangeOperation,
        snapshot: &'static str,
    },

    #[error("Row snapshot is missing field '{0}'")]
    MissingField(&'static str),

    #[error("Invalid notification timestamp {0}")]
    InvalidTimestamp(f64),
}

/// A decoded status change, ready for fan-out.
///
/// Immutable once constructed; shared between connections behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineStatusEvent {
    pub operation: ChangeOperation,
    pub machine_name: String,
    pub status: MachineStatus,
    pub observed_at: Timestamp,
    /// Present only on `Updated`.
    pub previous_status: Option<MachineStatus>,
    payload: Arc<str>,
}

impl MachineStatusEvent {
    /// The JSON text frame sent to clients.
    pub fn payload(&self) -> &str {
        &self.payload
    }
}

/// Decodes raw notification payloads for a single status table.
#[derive(Debug, Clone)]
pub struct ChangeDecoder {
    table: String,
}

impl ChangeDecoder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    /// Parses one notification payload into a [`MachineStatusEvent`].
    pub fn decode(&self, payload: &str) -> Result<MachineStatusEvent, DecodeError> {
        let notification: ChangeNotification = serde_json::from_str(payload)?;

        if notification.table != self.table {
            return Err(DecodeError::UnexpectedTable {
                expected: self.table.clone(),
                actual: notification.table,
            });
        }

        let operation = ChangeOperation::from_trigger_op(&notification.operation)
            .ok_or_else(|| DecodeError::UnknownOperation(notification.operation.clone()))?;

        let observed_at = Timestamp::from_epoch_secs(notification.timestamp)
            .ok_or(DecodeError::InvalidTimestamp(notification.timestamp))?;

        // Deletes describe the row that went away; everything else the row
        // as committed.
        let (current, snapshot) = match operation {
            ChangeOperation::Deleted => (notification.old_data.as_ref(), "old"),
            _ => (notification.new_data.as_ref(), "new"),
        };
        let current = current.ok_or(DecodeError::MissingSnapshot {
            operation,
            snapshot,
        })?;

        let machine_name = string_field(current, "machine_name")?.to_string();
        let status = MachineStatus::from(string_field(current, "status")?);

        let previous_status = match operation {
            ChangeOperation::Updated => notification
                .old_data
                .as_ref()
                .and_then(|old| old.get("status"))
                .and_then(Value::as_str)
                .map(MachineStatus::from),
            _ => None,
        };

        Ok(MachineStatusEvent {
            operation,
            machine_name,
            status,
            observed_at,
            previous_status,
            payload: Arc::from(payload),
        })
    }
}

fn string_field<'a>(
    row: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, DecodeError> {
    row.get(field)
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingField(field))
}
