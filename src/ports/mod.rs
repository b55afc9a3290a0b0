//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the core pipeline and the Status Store. Adapters implement these ports.
//!
//! - `ChangeFeed` / `ChangeStream` - Push subscription to committed row changes
//! - `StatusStore` - Latest status per machine and single-row status writes

mod change_feed;
mod status_store;

pub use change_feed::{ChangeFeed, ChangeStream, FeedError};
pub use status_store::{StatusRecord, StatusStore, StoreError};
