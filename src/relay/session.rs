//! Relay session
//!
//! Pairs one accepted client connection with one upstream adapter and keeps
//! their lifetimes tied together: audio chunks flow client → upstream, result
//! frames flow upstream → client, and either side ending tears down both.

use super::upstream::{UpstreamAdapter, UpstreamEvent};
use crate::config::UpstreamSettings;
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Lifecycle state of a relay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Active,
    Closing,
    Closed,
}

/// One client/upstream pairing. Created per accepted connection, destroyed
/// when either leg terminates.
pub struct RelaySession {
    id: Uuid,
    state: SessionState,
}

impl RelaySession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Connecting,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drive the session until either leg terminates. Cleanup of both legs
    /// runs on every exit path and is idempotent.
    pub async fn run(mut self, client: WebSocket, settings: &UpstreamSettings, api_key: &str) {
        info!(session = %self.id, "client connected");

        let mut adapter = match UpstreamAdapter::connect(settings, api_key).await {
            Ok(adapter) => adapter,
            Err(err) => {
                warn!(session = %self.id, error = %err, "upstream connect failed, closing client");
                self.state = SessionState::Closing;
                let mut client = client;
                let _ = client.send(Message::Close(None)).await;
                self.state = SessionState::Closed;
                return;
            }
        };

        self.state = SessionState::Active;
        let (mut client_tx, mut client_rx) = client.split();

        loop {
            tokio::select! {
                inbound = client_rx.next() => match inbound {
                    Some(Ok(Message::Binary(chunk))) => {
                        // Verbatim forward; if the upstream leg is gone the
                        // chunk is dropped, no buffering.
                        adapter.send_audio(chunk).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!(session = %self.id, "client disconnected");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Text/ping/pong are not part of the client contract.
                        debug!(session = %self.id, "ignoring non-binary client frame");
                    }
                    Some(Err(err)) => {
                        warn!(session = %self.id, error = %err, "client stream error");
                        break;
                    }
                },
                event = adapter.next_event() => match event {
                    Some(UpstreamEvent::Result(result)) => {
                        // Forward the recognizer's JSON verbatim, as text.
                        if client_tx.send(Message::Text(result.raw)).await.is_err() {
                            break;
                        }
                    }
                    Some(UpstreamEvent::Closed { code, reason }) => {
                        info!(session = %self.id, ?code, %reason, "upstream closed");
                        break;
                    }
                    Some(UpstreamEvent::Error(err)) => {
                        warn!(session = %self.id, error = %err, "upstream error");
                        break;
                    }
                    None => break,
                },
            }
        }

        self.state = SessionState::Closing;
        adapter.close().await;
        let _ = client_tx.send(Message::Close(None)).await;
        let _ = client_tx.close().await;
        self.state = SessionState::Closed;
        info!(session = %self.id, "session closed");
    }
}

impl Default for RelaySession {
    fn default() -> Self {
        Self::new()
    }
}
