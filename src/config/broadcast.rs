//! Broadcast hub configuration

use serde::Deserialize;
use std::time::Duration;

use crate::adapters::websocket::HubConfig;

use super::error::ValidationError;

/// Per-client delivery limits
#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastConfig {
    /// Outbound queue capacity per client
    #[serde(default = "default_client_buffer")]
    pub client_buffer: usize,

    /// Full-queue publishes in a row before a client is dropped
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// Longest a single frame write may take
    #[serde(default = "default_send_timeout")]
    pub send_timeout_ms: u64,
}

impl BroadcastConfig {
    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            client_buffer: self.client_buffer,
            max_consecutive_failures: self.max_consecutive_failures,
        }
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.client_buffer == 0 {
            return Err(ValidationError::MustBePositive("broadcast.client_buffer"));
        }
        if self.max_consecutive_failures == 0 {
            return Err(ValidationError::MustBePositive(
                "broadcast.max_consecutive_failures",
            ));
        }
        if self.send_timeout_ms == 0 {
            return Err(ValidationError::MustBePositive("broadcast.send_timeout_ms"));
        }
        Ok(())
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            client_buffer: default_client_buffer(),
            max_consecutive_failures: default_max_consecutive_failures(),
            send_timeout_ms: default_send_timeout(),
        }
    }
}

fn default_client_buffer() -> usize {
    64
}

fn default_max_consecutive_failures() -> u32 {
    3
}

fn default_send_timeout() -> u64 {
    5000
}
