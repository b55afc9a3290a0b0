//! PostgreSQL implementation of StatusStore.
//!
//! The status table keeps one or more rows per machine; the newest row by
//! `datetime` is the machine's current status. Writes update that row, and
//! the table's notify trigger announces the change.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::domain::foundation::Timestamp;
use crate::domain::machine::MachineStatus;
use crate::ports::{StatusRecord, StatusStore, StoreError};

use super::store_error;

/// PostgreSQL implementation of StatusStore.
#[derive(Clone)]
pub struct PostgresStatusStore {
    pool: PgPool,
    latest_sql: String,
    update_sql: String,
}

impl PostgresStatusStore {
    /// Creates a store over `table`, which must be a plain identifier.
    pub fn new(pool: PgPool, table: &str) -> Self {
        let latest_sql = format!(
            r#"
            SELECT DISTINCT ON (machine_name)
                machine_name, status, type, datetime::timestamptz AS datetime
            FROM {table}
            ORDER BY machine_name, datetime DESC NULLS LAST
            "#
        );
        let update_sql = format!(
            r#"
            UPDATE {table}
            SET status = $1, datetime = $2
            WHERE ctid = (
                SELECT ctid FROM {table}
                WHERE machine_name = $3
                ORDER BY datetime DESC NULLS LAST
                LIMIT 1
            )
            "#
        );

        Self {
            pool,
            latest_sql,
            update_sql,
        }
    }
}

#[async_trait]
impl StatusStore for PostgresStatusStore {
    async fn latest_statuses(&self) -> Result<HashMap<String, StatusRecord>, StoreError> {
        let rows = sqlx::query(&self.latest_sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| store_error("Failed to fetch latest statuses", e))?;

        let mut statuses = HashMap::with_capacity(rows.len());
        for row in rows {
            let name: String = row
                .try_get("machine_name")
                .map_err(|e| store_error("Invalid machine_name column", e))?;
            let status: String = row
                .try_get("status")
                .map_err(|e| store_error("Invalid status column", e))?;
            let machine_type: Option<String> = row
                .try_get("type")
                .map_err(|e| store_error("Invalid type column", e))?;
            let updated_at: Option<DateTime<Utc>> = row
                .try_get("datetime")
                .map_err(|e| store_error("Invalid datetime column", e))?;

            statuses.insert(
                name,
                StatusRecord {
                    status: MachineStatus::from(status),
                    machine_type,
                    updated_at: updated_at.map(Timestamp::from_datetime),
                },
            );
        }

        Ok(statuses)
    }

    async fn write_status(
        &self,
        machine_name: &str,
        status: &MachineStatus,
        at: Timestamp,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(&self.update_sql)
            .bind(status.as_str())
            .bind(at.as_datetime())
            .bind(machine_name)
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("Failed to write status", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::UnknownMachine(machine_name.to_string()));
        }

        Ok(())
    }
}
