//! Simulator configuration

use serde::Deserialize;
use std::time::Duration;

use crate::application::SimulatorSettings;
use crate::domain::simulation::StatusWeights;

use super::error::ValidationError;

/// Simulator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SimulatorConfig {
    /// Run the simulator at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Seconds between ticks
    #[serde(default = "default_interval")]
    pub interval_secs: f64,

    #[serde(default = "default_weight_operational")]
    pub weight_operational: f64,

    #[serde(default = "default_weight_warning")]
    pub weight_warning: f64,

    #[serde(default = "default_weight_down")]
    pub weight_down: f64,

    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,
}

impl SimulatorConfig {
    pub fn weights(&self) -> StatusWeights {
        StatusWeights::new(self.weight_operational, self.weight_warning, self.weight_down)
    }

    /// Falls back to the default interval for values `validate` rejects.
    pub fn interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.interval_secs)
            .ok()
            .filter(|interval| !interval.is_zero())
            .unwrap_or_else(|| Duration::from_secs_f64(default_interval()))
    }

    /// Settings for the simulator task.
    pub fn settings(&self) -> SimulatorSettings {
        SimulatorSettings {
            interval: self.interval(),
            weights: self.weights(),
            seed: self.seed,
        }
    }

    /// Validates even when disabled, so a bad value never waits for the
    /// flag to flip.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let interval = Duration::try_from_secs_f64(self.interval_secs).ok();
        if interval.map_or(true, |interval| interval.is_zero()) {
            return Err(ValidationError::MustBePositive("simulator.interval_secs"));
        }
        self.weights().validate()?;
        Ok(())
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_secs: default_interval(),
            weight_operational: default_weight_operational(),
            weight_warning: default_weight_warning(),
            weight_down: default_weight_down(),
            seed: None,
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_interval() -> f64 {
    4.0
}

fn default_weight_operational() -> f64 {
    60.0
}

fn default_weight_warning() -> f64 {
    30.0
}

fn default_weight_down() -> f64 {
    10.0
}
