//! PostgreSQL adapters - The production Status Store.
//!
//! - `PgChangeFeed` - `LISTEN` on the trigger's notify channel
//! - `PostgresStatusStore` - Latest status query and single-row writes
//!
//! Table and channel names come from configuration and are validated as
//! plain SQL identifiers before they reach these adapters.

mod change_feed;
mod status_store;

pub use change_feed::PgChangeFeed;
pub use status_store::PostgresStatusStore;

use crate::ports::StoreError;

/// Classifies a sqlx error as connectivity loss or query failure.
pub(crate) fn store_error(context: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(format!("{}: {}", context, err))
        }
        other => StoreError::Query(format!("{}: {}", context, other)),
    }
}
