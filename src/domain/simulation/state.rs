//! Per-machine memory of the simulator.

use std::collections::HashMap;

use crate::domain::foundation::Timestamp;
use crate::domain::machine::MachineStatus;

/// Last status the simulator knows for a machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineSnapshot {
    pub status: MachineStatus,
    pub changed_at: Timestamp,
}

/// Process-wide simulator state, reset on restart.
///
/// Only the simulator's own tick mutates it.
#[derive(Debug, Default)]
pub struct SimulatorState {
    machines: HashMap<String, MachineSnapshot>,
    writes: u64,
}

impl SimulatorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, machine_name: &str) -> Option<&MachineSnapshot> {
        self.machines.get(machine_name)
    }

    pub fn status_of(&self, machine_name: &str) -> Option<&MachineStatus> {
        self.get(machine_name).map(|s| &s.status)
    }

    /// Adopts a status observed in the Status Store without counting it as
    /// a simulator write. Keeps the existing change time when unchanged.
    pub fn observe(&mut self, machine_name: &str, status: MachineStatus, at: Timestamp) {
        match self.machines.get_mut(machine_name) {
            Some(snapshot) if snapshot.status == status => {}
            Some(snapshot) => {
                snapshot.status = status;
                snapshot.changed_at = at;
            }
            None => {
                self.machines.insert(
                    machine_name.to_string(),
                    MachineSnapshot {
                        status,
                        changed_at: at,
                    },
                );
            }
        }
    }

    /// Records a status the simulator wrote.
    pub fn record_write(&mut self, machine_name: &str, status: MachineStatus, at: Timestamp) {
        self.machines.insert(
            machine_name.to_string(),
            MachineSnapshot {
                status,
                changed_at: at,
            },
        );
        self.writes += 1;
    }

    /// Total writes since start.
    pub fn writes(&self) -> u64 {
        self.writes
    }
}
