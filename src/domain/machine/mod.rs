//! Machine module - floor topology, statuses and status change events.

mod event;
mod status;
mod topology;

pub use event::{
    ChangeDecoder, ChangeNotification, ChangeOperation, DecodeError, MachineStatusEvent,
};
pub use status::MachineStatus;
pub use topology::{FloorLayout, Machine, MachineType, ProductionLine};
