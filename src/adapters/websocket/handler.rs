//! WebSocket upgrade handler for live machine status.
//!
//! Each connection:
//! 1. Registers with the hub
//! 2. Forwards every queued event as a text frame
//! 3. Reads and discards inbound keepalives
//! 4. Unregisters when either direction ends

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};

use super::hub::{BroadcastHub, ClientId};
use super::messages::ClientMessage;

/// Close code sent when the server shuts the connection.
const CLOSE_GOING_AWAY: u16 = 1001;

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub hub: Arc<BroadcastHub>,
    /// Longest a single frame write may take before the connection is closed.
    pub send_timeout: Duration,
}

impl WebSocketState {
    pub fn new(hub: Arc<BroadcastHub>, send_timeout: Duration) -> Self {
        Self { hub, send_timeout }
    }
}

/// Route: `GET /ws`
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WebSocketState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Runs one client connection until it closes, fails, or is evicted.
async fn handle_socket(socket: WebSocket, state: WebSocketState) {
    let registration = state.hub.register().await;
    let client_id = registration.id;
    let mut events = registration.receiver;
    let (mut sender, mut receiver) = socket.split();

    tracing::info!(client_id = %client_id, "Client connected");

    let send_timeout = state.send_timeout;
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let frame = Message::Text(event.payload().to_string());
            match tokio::time::timeout(send_timeout, sender.send(frame)).await {
                Ok(Ok(())) => {
                    tracing::trace!(client_id = %client_id, machine = %event.machine_name, "Event sent");
                }
                Ok(Err(e)) => {
                    tracing::debug!(client_id = %client_id, error = %e, "Send failed, closing connection");
                    return;
                }
                Err(_) => {
                    tracing::info!(
                        client_id = %client_id,
                        timeout_ms = send_timeout.as_millis() as u64,
                        "Send timed out, closing connection"
                    );
                    return;
                }
            }
        }

        // Queue closed: evicted or hub shutting down.
        close(&mut sender, client_id, send_timeout).await;
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => match ClientMessage::parse(&text) {
                    Some(ClientMessage::Ping) => {
                        tracing::trace!(client_id = %client_id, "Keepalive received");
                    }
                    None => {
                        tracing::trace!(client_id = %client_id, "Ignoring inbound frame");
                    }
                },
                Ok(Message::Close(_)) => {
                    tracing::debug!(client_id = %client_id, "Client sent close frame");
                    break;
                }
                // Protocol ping/pong is answered by axum; binary is ignored.
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(client_id = %client_id, error = %e, "Receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.hub.unregister(&client_id).await;
    tracing::info!(client_id = %client_id, "Client disconnected");
}

async fn close(sender: &mut SplitSink<WebSocket, Message>, client_id: ClientId, timeout: Duration) {
    let frame = Message::Close(Some(CloseFrame {
        code: CLOSE_GOING_AWAY,
        reason: "server closing connection".into(),
    }));
    if let Ok(Err(e)) = tokio::time::timeout(timeout, sender.send(frame)).await {
        tracing::debug!(client_id = %client_id, error = %e, "Close frame not delivered");
    }
}

/// Create axum router for the WebSocket endpoint.
pub fn websocket_router() -> axum::Router<WebSocketState> {
    use axum::routing::get;

    axum::Router::new().route("/ws", get(ws_handler))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn websocket_state_shares_hub() {
        let hub = Arc::new(BroadcastHub::default());
        let state = WebSocketState::new(hub.clone(), Duration::from_secs(5));

        assert!(Arc::ptr_eq(&state.hub, &hub));
        assert_eq!(state.send_timeout, Duration::from_secs(5));
    }

    #[test]
    fn websocket_router_creates_route() {
        let _router = websocket_router();
    }
}
