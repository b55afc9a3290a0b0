//! Response bodies for the HTTP API.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::application::Liveness;
use crate::domain::foundation::DomainError;
use crate::domain::machine::{FloorLayout, Machine, MachineType};
use crate::ports::StatusRecord;

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

impl From<&DomainError> for ErrorResponse {
    fn from(err: &DomainError) -> Self {
        Self {
            code: err.code.to_string(),
            message: err.message.clone(),
            details: err
                .details
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Floor layout
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct MachineResponse {
    pub id: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub machine_type: MachineType,
    pub icon: &'static str,
    pub position: usize,
    pub line: String,
}

impl From<&Machine> for MachineResponse {
    fn from(machine: &Machine) -> Self {
        Self {
            id: machine.id,
            name: machine.name.clone(),
            machine_type: machine.machine_type,
            icon: machine.machine_type.icon(),
            position: machine.position,
            line: machine.line.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LineResponse {
    pub name: String,
    pub machines: Vec<MachineResponse>,
    pub machine_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FloorLayoutResponse {
    pub lines: BTreeMap<String, LineResponse>,
    pub total_machines: usize,
    pub machine_types: Vec<MachineType>,
}

impl From<&FloorLayout> for FloorLayoutResponse {
    fn from(layout: &FloorLayout) -> Self {
        let lines = layout
            .lines()
            .iter()
            .map(|line| {
                (
                    line.name.clone(),
                    LineResponse {
                        name: line.name.clone(),
                        machines: line.machines.iter().map(MachineResponse::from).collect(),
                        machine_count: line.machines.len(),
                    },
                )
            })
            .collect();

        Self {
            lines,
            total_machines: layout.total_machines(),
            machine_types: MachineType::ALL.to_vec(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Current status
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentStatusEntry {
    pub status: String,
    #[serde(rename = "type")]
    pub machine_type: String,
    pub datetime: Option<String>,
}

impl CurrentStatusEntry {
    /// Uses the stored type column, falling back to the name-derived type.
    pub fn from_record(machine_name: &str, record: &StatusRecord) -> Self {
        let machine_type = record
            .machine_type
            .clone()
            .unwrap_or_else(|| MachineType::from_machine_name(machine_name).to_string());
        Self {
            status: record.status.to_string(),
            machine_type,
            datetime: record.updated_at.map(|at| at.to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentStatusResponse {
    pub machine_statuses: BTreeMap<String, CurrentStatusEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

// ════════════════════════════════════════════════════════════════════════════
// Health
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub listener: Liveness,
    pub clients: usize,
    pub simulator_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;
    use crate::domain::machine::MachineStatus;

    #[test]
    fn layout_response_counts_machines_per_line() {
        let response = FloorLayoutResponse::from(&FloorLayout::default_floor());
        assert_eq!(response.total_machines, 30);
        assert_eq!(response.lines.len(), 4);
        let per_line: usize = response.lines.values().map(|l| l.machine_count).sum();
        assert_eq!(per_line, 30);
        assert_eq!(response.machine_types.len(), MachineType::ALL.len());
    }

    #[test]
    fn machine_response_serializes_type_and_icon() {
        let layout = FloorLayout::default_floor();
        let valve = layout.find("Valve_02_01").unwrap();
        let json = serde_json::to_value(MachineResponse::from(valve)).unwrap();
        assert_eq!(json["type"], "valve");
        assert_eq!(json["icon"], "valve_icon.png");
        assert_eq!(json["name"], "Valve_02_01");
    }

    #[test]
    fn status_entry_falls_back_to_name_derived_type() {
        let record = StatusRecord {
            status: MachineStatus::Warning,
            machine_type: None,
            updated_at: Some(Timestamp::now()),
        };
        let entry = CurrentStatusEntry::from_record("Painter_03_02", &record);
        assert_eq!(entry.machine_type, "painter");
        assert_eq!(entry.status, "warning");
        assert!(entry.datetime.is_some());
    }
}
