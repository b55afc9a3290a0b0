//! Change listener configuration

use serde::Deserialize;
use std::time::Duration;

use crate::application::BackoffPolicy;

use super::error::ValidationError;

/// Reconnect backoff bounds
#[derive(Debug, Clone, Deserialize)]
pub struct ListenerConfig {
    #[serde(default = "default_backoff_initial")]
    pub backoff_initial_ms: u64,

    #[serde(default = "default_backoff_max")]
    pub backoff_max_ms: u64,
}

impl ListenerConfig {
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            initial: Duration::from_millis(self.backoff_initial_ms),
            max: Duration::from_millis(self.backoff_max_ms),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.backoff_initial_ms == 0 {
            return Err(ValidationError::MustBePositive("listener.backoff_initial_ms"));
        }
        if self.backoff_initial_ms > self.backoff_max_ms {
            return Err(ValidationError::InvalidBackoffRange);
        }
        Ok(())
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            backoff_initial_ms: default_backoff_initial(),
            backoff_max_ms: default_backoff_max(),
        }
    }
}

fn default_backoff_initial() -> u64 {
    1000
}

fn default_backoff_max() -> u64 {
    30_000
}
