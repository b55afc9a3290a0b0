//! HTTP adapters - REST and WebSocket endpoints.
//!
//! - `GET /ws` - Live status events
//! - `GET /health` - Listener liveness
//! - `GET /api/machines` - Floor layout
//! - `GET /api/machines/current-status` - Latest status per machine
//! - `GET /api/machines/:name` - One machine's location

pub mod dto;
pub mod health;
pub mod machines;

use std::sync::Arc;
use std::time::Duration;

use axum::{http::HeaderValue, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::adapters::websocket::{websocket_router, BroadcastHub, WebSocketState};
use crate::application::ListenerHealth;
use crate::domain::machine::FloorLayout;
use crate::ports::StatusStore;

/// Shared state for every HTTP handler.
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<BroadcastHub>,
    pub store: Arc<dyn StatusStore>,
    pub layout: Arc<FloorLayout>,
    pub listener: ListenerHealth,
    pub simulator_enabled: bool,
    pub send_timeout: Duration,
}

/// Assembles the full router.
///
/// `cors_origins` of `None` allows any origin.
pub fn app_router(state: AppState, cors_origins: Option<&[String]>) -> Router {
    let ws_state = WebSocketState::new(state.hub.clone(), state.send_timeout);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/machines", get(machines::get_layout))
        .route("/api/machines/current-status", get(machines::get_current_status))
        .route("/api/machines/:name", get(machines::get_machine))
        .with_state(state)
        .merge(websocket_router().with_state(ws_state))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: Option<&[String]>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origins {
        None => layer.allow_origin(Any),
        Some(origins) => {
            let allowed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            layer.allow_origin(allowed)
        }
    }
}
