//! HTTP handlers for machine endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::domain::foundation::{DomainError, ErrorCode};

use super::dto::{
    CurrentStatusEntry, CurrentStatusResponse, ErrorResponse, FloorLayoutResponse,
    MachineResponse,
};
use super::AppState;

/// GET /api/machines - Static floor layout
pub async fn get_layout(State(state): State<AppState>) -> Json<FloorLayoutResponse> {
    Json(FloorLayoutResponse::from(state.layout.as_ref()))
}

/// GET /api/machines/:name - One machine's place on the floor
pub async fn get_machine(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.layout.find(&name) {
        Some(machine) => Json(MachineResponse::from(machine)).into_response(),
        None => {
            let err = DomainError::new(
                ErrorCode::MachineNotFound,
                format!("Machine not found: {}", name),
            )
            .with_detail("machine_name", name);
            (StatusCode::NOT_FOUND, Json(ErrorResponse::from(&err))).into_response()
        }
    }
}

/// GET /api/machines/current-status - Latest status per machine
///
/// Store failures answer 503 with an empty map so the floor view can still
/// render.
pub async fn get_current_status(State(state): State<AppState>) -> Response {
    match state.store.latest_statuses().await {
        Ok(records) => {
            let machine_statuses = records
                .iter()
                .map(|(name, record)| (name.clone(), CurrentStatusEntry::from_record(name, record)))
                .collect();
            Json(CurrentStatusResponse {
                machine_statuses,
                error: None,
            })
            .into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read current machine statuses");
            let err = DomainError::from(e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(CurrentStatusResponse {
                    machine_statuses: Default::default(),
                    error: Some(ErrorResponse::from(&err)),
                }),
            )
                .into_response()
        }
    }
}
