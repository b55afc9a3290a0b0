//! MachineStatus for the state a machine reports on the floor.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reported status of a machine.
///
/// The Status Store holds free-form strings; anything outside the three
/// known values is preserved verbatim in `Other` so it reaches clients
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MachineStatus {
    Operational,
    Warning,
    Down,
    Other(String),
}

impl MachineStatus {
    /// Statuses the simulator draws from, in weight order.
    pub const SIMULATED: [MachineStatus; 3] = [
        MachineStatus::Operational,
        MachineStatus::Warning,
        MachineStatus::Down,
    ];

    /// Returns the wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            MachineStatus::Operational => "operational",
            MachineStatus::Warning => "warning",
            MachineStatus::Down => "down",
            MachineStatus::Other(s) => s,
        }
    }

    /// Returns true for one of the three statuses the floor understands.
    pub fn is_known(&self) -> bool {
        !matches!(self, MachineStatus::Other(_))
    }
}

impl From<&str> for MachineStatus {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "operational" => MachineStatus::Operational,
            "warning" => MachineStatus::Warning,
            "down" => MachineStatus::Down,
            _ => MachineStatus::Other(s.to_string()),
        }
    }
}

impl From<String> for MachineStatus {
    fn from(s: String) -> Self {
        MachineStatus::from(s.as_str())
    }
}

impl From<MachineStatus> for String {
    fn from(status: MachineStatus) -> Self {
        match status {
            MachineStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
