//! Capture controller
//!
//! Client-side state machine around one recording session: open the session
//! link, acquire the microphone, pump fixed-interval chunks out and
//! recognition results into the turn engine. One capture session per
//! controller; `start` while streaming is a no-op and every exit path
//! releases the microphone.

use super::link::{SessionConnector, SessionLink};
use super::mic::MicSource;
use crate::relay::wire::parse_recognition_event;
use crate::turns::{Turn, TurnEngineHandle};
use anyhow::Result;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Connecting,
    Streaming,
}

pub struct CaptureController {
    connector: Arc<dyn SessionConnector>,
    mic: Arc<dyn MicSource>,
    engine: TurnEngineHandle,
    state: Arc<Mutex<CaptureState>>,
    shutdown: Option<oneshot::Sender<()>>,
    driver: Option<JoinHandle<()>>,
}

impl CaptureController {
    pub fn new(
        connector: Arc<dyn SessionConnector>,
        mic: Arc<dyn MicSource>,
        engine: TurnEngineHandle,
    ) -> Self {
        Self {
            connector,
            mic,
            engine,
            state: Arc::new(Mutex::new(CaptureState::Idle)),
            shutdown: None,
            driver: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn engine(&self) -> &TurnEngineHandle {
        &self.engine
    }

    /// Begin streaming: open the session, then acquire the microphone.
    ///
    /// A second `start` while streaming is a no-op. Microphone acquisition
    /// failure tears the session back down and returns the error for the
    /// user-facing layer to surface.
    pub async fn start(&mut self) -> Result<()> {
        if self.state() == CaptureState::Streaming {
            debug!("capture already streaming, ignoring start");
            return Ok(());
        }

        self.set_state(CaptureState::Connecting);

        let mut link = match self.connector.connect().await {
            Ok(link) => link,
            Err(err) => {
                self.set_state(CaptureState::Idle);
                return Err(err.context("session connect failed"));
            }
        };

        let chunks = match self.mic.start().await {
            Ok(chunks) => chunks,
            Err(err) => {
                link.close().await;
                self.set_state(CaptureState::Idle);
                return Err(err.context("microphone acquisition failed"));
            }
        };

        info!(mic = self.mic.name(), "capture streaming");
        self.set_state(CaptureState::Streaming);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shutdown = Some(shutdown_tx);
        self.driver = Some(tokio::spawn(drive(
            link,
            chunks,
            Arc::clone(&self.mic),
            self.engine.clone(),
            Arc::clone(&self.state),
            shutdown_rx,
        )));
        Ok(())
    }

    /// Stop streaming: release the microphone, close the session, and
    /// force-commit any pending transcript text. Stopping an already
    /// stopped controller is a no-op.
    pub async fn stop(&mut self) -> Option<Turn> {
        if self.state() == CaptureState::Idle && self.driver.is_none() {
            return None;
        }

        self.mic.stop();
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(driver) = self.driver.take() {
            let _ = driver.await;
        }

        // Bypass the inactivity timer; buffered text commits now.
        self.engine.force_commit().await
    }

    fn set_state(&self, state: CaptureState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }
}

/// Session pump: audio chunks out, recognition results in. Runs until the
/// mic stops, the session closes, or a shutdown is requested; cleanup runs
/// on every exit path.
async fn drive(
    mut link: Box<dyn SessionLink>,
    mut chunks: mpsc::Receiver<Vec<u8>>,
    mic: Arc<dyn MicSource>,
    engine: TurnEngineHandle,
    state: Arc<Mutex<CaptureState>>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                debug!("capture shutdown requested");
                break;
            }
            chunk = chunks.recv() => match chunk {
                Some(chunk) => {
                    if link.send_chunk(chunk).await.is_err() {
                        warn!("session send failed, stopping capture");
                        break;
                    }
                }
                None => break, // mic released
            },
            message = link.next_message() => match message {
                Some(Ok(text)) => {
                    // Non-Results and malformed payloads parse to None and
                    // are dropped here.
                    if let Some(event) = parse_recognition_event(&text) {
                        engine.observe(event).await;
                    }
                }
                Some(Err(err)) => {
                    warn!(error = %err, "session stream error");
                    break;
                }
                None => {
                    info!("session closed by relay");
                    break;
                }
            },
        }
    }

    mic.stop();
    link.close().await;
    engine.cancel_timer().await;
    *state.lock().unwrap_or_else(|e| e.into_inner()) = CaptureState::Idle;
}
