//! Foundation module - Shared domain primitives.
//!
//! Contains the value objects and error types shared by the machine and
//! simulation modules.

mod errors;
mod timestamp;

pub use errors::{DomainError, ErrorCode};
pub use timestamp::Timestamp;
