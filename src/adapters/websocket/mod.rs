//! WebSocket adapters for live machine status.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        ChangeListener                               │
//! │   PgChangeFeed (production) │ InMemoryChangeFeed (test)             │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     │ publish(event)
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         BroadcastHub                                │
//! │   client-a [queue]    client-b [queue]    client-c [queue]          │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     │ one send loop per client
//!                                     ▼
//!                            browser WebSockets
//! ```
//!
//! # Components
//!
//! - [`hub`] - Client registry and non-blocking fan-out
//! - [`handler`] - Axum WebSocket upgrade handler running each connection
//! - [`messages`] - Inbound message types

pub mod handler;
pub mod hub;
pub mod messages;

pub use handler::{websocket_router, ws_handler, WebSocketState};
pub use hub::{BroadcastHub, ClientId, HubConfig, PublishReport, Registration};
pub use messages::ClientMessage;
