use super::state::AppState;
use crate::relay::RelaySession;
use axum::{
    extract::{ws::WebSocket, State, WebSocketUpgrade},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;

/// GET /realtime
/// Upgrade the client connection and hand the socket to a relay session.
/// Only this exact path upgrades; the router rejects everything else.
pub async fn realtime_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| relay_connection(socket, state))
}

async fn relay_connection(socket: WebSocket, state: AppState) {
    state.session_started();
    debug!(active = state.active_sessions(), "relay session starting");

    RelaySession::new()
        .run(socket, &state.upstream, &state.api_key)
        .await;

    state.session_ended();
    debug!(active = state.active_sessions(), "relay session finished");
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
