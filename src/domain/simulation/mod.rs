//! Simulation module - weighted status draws and simulator memory.

mod state;
mod weights;

pub use state::{MachineSnapshot, SimulatorState};
pub use weights::{StatusDraw, StatusWeights, WeightsError};
