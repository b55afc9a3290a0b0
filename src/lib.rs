//! Machine Feed - Live machine status for factory floor dashboards
//!
//! Status changes committed to the Status Store are pushed through a single
//! change listener into a broadcast hub that fans them out to every
//! connected WebSocket client. A simulator keeps the floor moving by writing
//! weighted random status changes through the same store.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
