//! Domain layer containing the machine floor vocabulary.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (timestamps, errors)
//! - `machine` - Floor topology, statuses and decoded change events
//! - `simulation` - Weighted status draws and simulator state

pub mod foundation;
pub mod machine;
pub mod simulation;
