//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `MACHINE_FEED` prefix
//! and nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use machine_feed::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod broadcast;
mod database;
mod error;
mod listener;
mod server;
mod simulator;

pub use broadcast::BroadcastConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use listener::ListenerConfig;
pub use server::{LogFormat, ServerConfig};
pub use simulator::SimulatorConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP server and logging
    #[serde(default)]
    pub server: ServerConfig,

    /// Status Store connection (PostgreSQL)
    pub database: DatabaseConfig,

    /// Synthetic status writer
    #[serde(default)]
    pub simulator: SimulatorConfig,

    /// Per-client delivery limits
    #[serde(default)]
    pub broadcast: BroadcastConfig,

    /// Change listener reconnect policy
    #[serde(default)]
    pub listener: ListenerConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `MACHINE_FEED` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `MACHINE_FEED__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `MACHINE_FEED__SIMULATOR__ENABLED=false` -> `simulator.enabled = false`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into their expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("MACHINE_FEED")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid value found,
    /// including a simulator weight distribution that can never draw.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.simulator.validate()?;
        self.broadcast.validate()?;
        self.listener.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "MACHINE_FEED__DATABASE__URL",
        "MACHINE_FEED__SERVER__PORT",
        "MACHINE_FEED__SERVER__LOG_FORMAT",
        "MACHINE_FEED__SIMULATOR__ENABLED",
        "MACHINE_FEED__SIMULATOR__WEIGHT_OPERATIONAL",
        "MACHINE_FEED__SIMULATOR__WEIGHT_WARNING",
        "MACHINE_FEED__SIMULATOR__WEIGHT_DOWN",
        "MACHINE_FEED__BROADCAST__MAX_CONSECUTIVE_FAILURES",
        "MACHINE_FEED__LISTENER__BACKOFF_MAX_MS",
    ];

    fn set_minimal_env() {
        env::set_var("MACHINE_FEED__DATABASE__URL", "postgresql://test@localhost/factory");
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/factory");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_section_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.notify_channel, "machine_feed_stream_changes");
        assert!(config.simulator.enabled);
        assert_eq!(config.broadcast.max_consecutive_failures, 3);
        assert_eq!(config.listener.backoff_max_ms, 30_000);
    }

    #[test]
    fn test_nested_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("MACHINE_FEED__SERVER__PORT", "3000");
        env::set_var("MACHINE_FEED__SERVER__LOG_FORMAT", "json");
        env::set_var("MACHINE_FEED__SIMULATOR__ENABLED", "false");
        env::set_var("MACHINE_FEED__BROADCAST__MAX_CONSECUTIVE_FAILURES", "5");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.log_format, LogFormat::Json);
        assert!(!config.simulator.enabled);
        assert_eq!(config.broadcast.max_consecutive_failures, 5);
    }

    #[test]
    fn test_missing_database_url_fails_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        assert!(AppConfig::load().is_err());
    }

    #[test]
    fn test_all_zero_weights_fail_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("MACHINE_FEED__SIMULATOR__WEIGHT_OPERATIONAL", "0");
        env::set_var("MACHINE_FEED__SIMULATOR__WEIGHT_WARNING", "0");
        env::set_var("MACHINE_FEED__SIMULATOR__WEIGHT_DOWN", "0");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidWeights(_))
        ));
    }
}
