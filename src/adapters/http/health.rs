//! GET /health - Listener liveness and connected client count.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::application::Liveness;

use super::dto::HealthResponse;
use super::AppState;

/// Answers 200 while the change listener is connected, 503 otherwise.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let liveness = state.listener.liveness();
    let (code, status) = overall_status(liveness);

    let body = HealthResponse {
        status,
        listener: liveness,
        clients: state.hub.client_count().await,
        simulator_enabled: state.simulator_enabled,
    };

    (code, Json(body))
}

/// Status word and code for a listener state.
fn overall_status(liveness: Liveness) -> (StatusCode, &'static str) {
    match liveness {
        Liveness::Connected => (StatusCode::OK, "ok"),
        Liveness::Starting => (StatusCode::SERVICE_UNAVAILABLE, "starting"),
        Liveness::Reconnecting => (StatusCode::SERVICE_UNAVAILABLE, "reconnecting"),
        Liveness::Degraded | Liveness::Stopped => (StatusCode::SERVICE_UNAVAILABLE, "degraded"),
    }
}
