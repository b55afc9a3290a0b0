//! StatusStore port - Read and write access to machine statuses.
//!
//! Writes go through the same path as operator actions; the store is
//! responsible for emitting the change notification.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::domain::machine::MachineStatus;

/// Errors raised by the Status Store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Status store unavailable: {0}")]
    Unavailable(String),

    #[error("Status store query failed: {0}")]
    Query(String),

    #[error("No status row for machine '{0}'")]
    UnknownMachine(String),
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        let code = match &err {
            StoreError::Unavailable(_) => ErrorCode::StoreUnavailable,
            StoreError::Query(_) => ErrorCode::DatabaseError,
            StoreError::UnknownMachine(_) => ErrorCode::MachineNotFound,
        };
        DomainError::new(code, err.to_string())
    }
}

/// Latest row for a machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRecord {
    pub status: MachineStatus,
    /// Stored machine type column, if any.
    pub machine_type: Option<String>,
    pub updated_at: Option<Timestamp>,
}

/// Port for the Status Store.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Latest status per machine name.
    async fn latest_statuses(&self) -> Result<HashMap<String, StatusRecord>, StoreError>;

    /// Writes one status change for one machine.
    async fn write_status(
        &self,
        machine_name: &str,
        status: &MachineStatus,
        at: Timestamp,
    ) -> Result<(), StoreError>;
}
