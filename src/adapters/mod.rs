//! Adapters - Implementations of port interfaces.
//!
//! - `postgres` - Production Status Store (sqlx)
//! - `memory` - In-process Status Store with a trigger-like change channel
//! - `websocket` - Broadcast hub and client connections
//! - `http` - Axum router for the REST and WebSocket surface

pub mod http;
pub mod memory;
pub mod postgres;
pub mod websocket;

pub use memory::{InMemoryChangeFeed, InMemoryStatusStore};
pub use postgres::{PgChangeFeed, PostgresStatusStore};
pub use websocket::{BroadcastHub, HubConfig};
