//! In-memory Status Store adapters.
//!
//! A trigger-like stand-in for the database, used where no Postgres is
//! available.

mod change_feed;
mod status_store;

pub use change_feed::InMemoryChangeFeed;
pub use status_store::InMemoryStatusStore;
