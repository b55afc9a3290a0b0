//! Client-to-server messages.
//!
//! Outbound frames are the raw change notification text, so only the
//! inbound side has a type here. Browsers may send keepalives; anything
//! else is ignored.

use serde::Deserialize;

/// Message types a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Keepalive.
    Ping,
}

impl ClientMessage {
    /// Parses an inbound text frame. Unrecognised frames yield `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.eq_ignore_ascii_case("ping") {
            return Some(ClientMessage::Ping);
        }
        serde_json::from_str(trimmed).ok()
    }
}
