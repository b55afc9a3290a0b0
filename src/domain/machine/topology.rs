//! Static floor topology: production lines and the machines in flow order.
//!
//! The layout is built once at startup and shared read-only. Status is not
//! part of the topology; it lives in the Status Store keyed by machine name.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of machine, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineType {
    Sorter,
    RoboticArm,
    InjectionMolder,
    Painter,
    Valve,
}

impl MachineType {
    pub const ALL: [MachineType; 5] = [
        MachineType::InjectionMolder,
        MachineType::RoboticArm,
        MachineType::Sorter,
        MachineType::Painter,
        MachineType::Valve,
    ];

    /// Infers the type from a name such as `Injection_Molder_02_01`.
    ///
    /// Names that match nothing fall back to `Sorter`.
    pub fn from_machine_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.contains("sorter") {
            MachineType::Sorter
        } else if lower.contains("robotic") {
            MachineType::RoboticArm
        } else if lower.contains("molder") {
            MachineType::InjectionMolder
        } else if lower.contains("painter") {
            MachineType::Painter
        } else if lower.contains("valve") {
            MachineType::Valve
        } else {
            MachineType::Sorter
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MachineType::Sorter => "sorter",
            MachineType::RoboticArm => "robotic_arm",
            MachineType::InjectionMolder => "injection_molder",
            MachineType::Painter => "painter",
            MachineType::Valve => "valve",
        }
    }

    /// Icon asset shown on the floor view.
    pub fn icon(&self) -> &'static str {
        match self {
            MachineType::Sorter => "sorter.png",
            MachineType::RoboticArm => "robotic_arm.png",
            MachineType::InjectionMolder => "injection_molder.png",
            MachineType::Painter => "painter.png",
            MachineType::Valve => "valve_icon.png",
        }
    }
}

impl fmt::Display for MachineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A machine on the floor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    pub id: u32,
    pub name: String,
    pub machine_type: MachineType,
    pub line: String,
    pub position: usize,
}

/// A production line with its machines in flow order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductionLine {
    pub name: String,
    pub machines: Vec<Machine>,
}

/// The complete floor layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloorLayout {
    lines: Vec<ProductionLine>,
}

impl FloorLayout {
    /// Builds a layout from line names and ordered machine names.
    ///
    /// Machine ids are assigned sequentially from 1 in layout order, so they
    /// stay stable for a given layout.
    pub fn from_lines<L, M>(lines: L) -> Self
    where
        L: IntoIterator<Item = (String, M)>,
        M: IntoIterator<Item = String>,
    {
        let mut next_id = 1;
        let lines = lines
            .into_iter()
            .map(|(line_name, names)| {
                let machines = names
                    .into_iter()
                    .enumerate()
                    .map(|(position, name)| {
                        let machine = Machine {
                            id: next_id,
                            machine_type: MachineType::from_machine_name(&name),
                            name,
                            line: line_name.clone(),
                            position,
                        };
                        next_id += 1;
                        machine
                    })
                    .collect();
                ProductionLine {
                    name: line_name,
                    machines,
                }
            })
            .collect();

        Self { lines }
    }

    /// The demonstration floor: four lines, thirty machines.
    pub fn default_floor() -> Self {
        const LINES: &[(&str, &[&str])] = &[
            (
                "Transmission Line",
                &[
                    "Source_Sorter_01_01",
                    "Robotic_Arm_01_01",
                    "Injection_Molder_01_01",
                    "Valve_01_01",
                    "Injection_Molder_01_02",
                    "Robotic_Arm_01_02",
                    "Painter_01_02",
                    "Robotic_Arm_01_03",
                    "Sorter_01_01",
                ],
            ),
            (
                "Engine Line",
                &[
                    "Injection_Molder_02_01",
                    "Valve_02_01",
                    "Injection_Molder_02_02",
                    "Robotic_Arm_02_01",
                    "Painter_02_01",
                    "Robotic_Arm_02_02",
                    "Sorter_02_01",
                ],
            ),
            (
                "Exterior Line",
                &[
                    "Sorter_03_01",
                    "Robotic_Arm_03_01",
                    "Injection_Molder_03_01",
                    "Valve_03_01",
                    "Injection_Molder_03_02",
                    "Robotic_Arm_03_02",
                    "Painter_03_01",
                    "Robotic_Arm_03_03",
                    "Injection_Molder_03_03",
                ],
            ),
            (
                "Interior Line",
                &[
                    "Injection_Molder_04_01",
                    "Valve_04_01",
                    "Robotic_Arm_04_01",
                    "Painter_04_01",
                    "Sorter_04_01",
                ],
            ),
        ];

        Self::from_lines(LINES.iter().map(|(line, machines)| {
            (
                line.to_string(),
                machines.iter().map(|m| m.to_string()).collect::<Vec<_>>(),
            )
        }))
    }

    pub fn lines(&self) -> &[ProductionLine] {
        &self.lines
    }

    /// All machines across all lines, in layout order.
    pub fn machines(&self) -> impl Iterator<Item = &Machine> {
        self.lines.iter().flat_map(|line| line.machines.iter())
    }

    pub fn find(&self, name: &str) -> Option<&Machine> {
        self.machines().find(|m| m.name == name)
    }

    pub fn total_machines(&self) -> usize {
        self.lines.iter().map(|line| line.machines.len()).sum()
    }
}

impl Default for FloorLayout {
    fn default() -> Self {
        Self::default_floor()
    }
}
