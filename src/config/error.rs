//! Configuration error types

use thiserror::Error;

use crate::domain::simulation::WeightsError;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid bind address '{0}'")]
    InvalidBindAddress(String),

    #[error("Invalid log format '{0}', expected 'pretty' or 'json'")]
    InvalidLogFormat(String),

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool max_connections must be between 1 and 100")]
    InvalidPoolSize,

    #[error("{field} must be a plain SQL identifier, got '{value}'")]
    InvalidIdentifier { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    MustBePositive(&'static str),

    #[error("Invalid simulator weights: {0}")]
    InvalidWeights(#[from] WeightsError),

    #[error("Listener backoff_initial_ms exceeds backoff_max_ms")]
    InvalidBackoffRange,
}
