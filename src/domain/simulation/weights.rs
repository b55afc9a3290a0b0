//! Categorical status weights and the memoryless draw built from them.

use rand::distributions::{Distribution, WeightedError, WeightedIndex};
use rand::Rng;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::machine::MachineStatus;

/// Invalid weight distribution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeightsError {
    #[error("Weight for '{status}' must be a finite, non-negative number, got {value}")]
    InvalidWeight { status: &'static str, value: f64 },

    #[error("Status weights sum to zero; the simulator would never transition")]
    AllZero,

    #[error("Status weights sum to {total}, which is not a finite number")]
    TotalNotFinite { total: f64 },

    #[error("Status weights cannot build a distribution: {0}")]
    Unusable(String),
}

/// Relative weights for operational, warning and down.
///
/// Need not be normalised: `(60, 30, 10)` and `(0.6, 0.3, 0.1)` describe the
/// same distribution.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct StatusWeights {
    pub operational: f64,
    pub warning: f64,
    pub down: f64,
}

impl StatusWeights {
    pub fn new(operational: f64, warning: f64, down: f64) -> Self {
        Self {
            operational,
            warning,
            down,
        }
    }

    fn as_array(&self) -> [(&'static str, f64); 3] {
        [
            ("operational", self.operational),
            ("warning", self.warning),
            ("down", self.down),
        ]
    }

    /// Checks every weight is usable, their sum is finite and at least one
    /// is positive.
    pub fn validate(&self) -> Result<(), WeightsError> {
        for (status, value) in self.as_array() {
            if !value.is_finite() || value < 0.0 {
                return Err(WeightsError::InvalidWeight { status, value });
            }
        }
        let total = self.total();
        if !total.is_finite() {
            return Err(WeightsError::TotalNotFinite { total });
        }
        if total <= 0.0 {
            return Err(WeightsError::AllZero);
        }
        Ok(())
    }

    pub fn total(&self) -> f64 {
        self.operational + self.warning + self.down
    }

    /// Probabilities in [`MachineStatus::SIMULATED`] order.
    pub fn normalized(&self) -> Result<[f64; 3], WeightsError> {
        self.validate()?;
        let total = self.total();
        Ok([
            self.operational / total,
            self.warning / total,
            self.down / total,
        ])
    }
}

impl Default for StatusWeights {
    fn default() -> Self {
        Self::new(60.0, 30.0, 10.0)
    }
}

/// Stationary categorical draw over the simulated statuses.
///
/// Each draw is independent of the machine's current status.
#[derive(Debug, Clone)]
pub struct StatusDraw {
    index: WeightedIndex<f64>,
}

impl StatusDraw {
    pub fn new(weights: StatusWeights) -> Result<Self, WeightsError> {
        let index = WeightedIndex::new(weights.normalized()?).map_err(|e| match e {
            WeightedError::AllWeightsZero => WeightsError::AllZero,
            other => WeightsError::Unusable(other.to_string()),
        })?;
        Ok(Self { index })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> MachineStatus {
        MachineStatus::SIMULATED[self.index.sample(rng)].clone()
    }
}
