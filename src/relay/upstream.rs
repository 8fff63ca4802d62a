//! Upstream session adapter
//!
//! Owns exactly one connection to the external streaming recognizer and
//! translates its wire messages into a normalized event stream. The adapter
//! never reconnects; any error or close is surfaced once as a terminal event
//! and the owning relay session decides what to do (here: end the session).

use super::wire::{parse_recognition_event, RecognitionEvent};
use crate::config::UpstreamSettings;
use anyhow::{Context, Result};
use futures::stream::{SplitSink, StreamExt};
use futures::SinkExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

impl UpstreamSettings {
    /// Render the full recognizer URL with its fixed query parameters.
    pub fn endpoint(&self) -> String {
        format!(
            "{}?model={}&language={}&smart_format={}&interim_results={}",
            self.url, self.model, self.language, self.smart_format, self.interim_results
        )
    }
}

/// Observable adapter events. Exactly one terminal event (`Closed` or
/// `Error`) is emitted per adapter lifetime.
#[derive(Debug)]
pub enum UpstreamEvent {
    /// A Results frame, normalized. Non-Results frames never surface here.
    Result(RecognitionEvent),
    Closed { code: Option<u16>, reason: String },
    Error(String),
}

/// One live connection to the streaming recognizer.
pub struct UpstreamAdapter {
    sink: Option<WsSink>,
    events: mpsc::Receiver<UpstreamEvent>,
    _reader: JoinHandle<()>,
}

impl UpstreamAdapter {
    /// Open the recognizer connection. The credential travels in the
    /// vendor's bearer-style authorization header and nowhere else.
    pub async fn connect(settings: &UpstreamSettings, api_key: &str) -> Result<Self> {
        let mut request = settings
            .endpoint()
            .into_client_request()
            .context("invalid upstream recognizer URL")?;
        request.headers_mut().insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Token {api_key}"))
                .context("upstream credential is not a valid header value")?,
        );

        let (stream, _) = connect_async(request)
            .await
            .context("failed to connect to upstream recognizer")?;
        debug!("upstream recognizer connected");

        let (sink, source) = stream.split();
        let (event_tx, event_rx) = mpsc::channel(64);
        let reader = tokio::spawn(read_loop(source, event_tx));

        Ok(Self {
            sink: Some(sink),
            events: event_rx,
            _reader: reader,
        })
    }

    /// Forward one opaque binary audio chunk to the recognizer.
    ///
    /// Chunks sent after the adapter closed are dropped silently; losing
    /// audio during teardown is part of the contract, not an error.
    pub async fn send_audio(&mut self, chunk: Vec<u8>) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        if let Err(err) = sink.send(Message::Binary(chunk.into())).await {
            debug!(error = %err, "upstream send failed, dropping sink");
            self.sink = None;
        }
    }

    /// Whether the audio leg is still writable.
    pub fn is_open(&self) -> bool {
        self.sink.is_some()
    }

    /// Close the upstream connection. Safe to call more than once.
    pub async fn close(&mut self) {
        if let Some(mut sink) = self.sink.take() {
            let _ = sink.send(Message::Close(None)).await;
            let _ = sink.close().await;
        }
    }

    /// Next normalized event, or `None` once the adapter has emitted its
    /// terminal event and the channel drained.
    pub async fn next_event(&mut self) -> Option<UpstreamEvent> {
        self.events.recv().await
    }
}

async fn read_loop(
    mut source: futures::stream::SplitStream<WsStream>,
    events: mpsc::Sender<UpstreamEvent>,
) {
    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                forward_if_result(text.as_str(), &events).await;
            }
            // The upstream protocol may deliver its JSON as binary frames;
            // normalize to UTF-8 text and treat undecodable payloads as noise.
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => forward_if_result(&text, &events).await,
                Err(_) => debug!("dropping non-UTF-8 upstream frame"),
            },
            Ok(Message::Close(frame)) => {
                let (code, reason) = match frame {
                    Some(f) => (Some(u16::from(f.code)), f.reason.to_string()),
                    None => (None, String::new()),
                };
                let _ = events.send(UpstreamEvent::Closed { code, reason }).await;
                return;
            }
            Ok(_) => {} // ping/pong/raw frames
            Err(err) => {
                warn!(error = %err, "upstream recognizer stream error");
                let _ = events.send(UpstreamEvent::Error(err.to_string())).await;
                return;
            }
        }
    }

    // Stream ended without a close frame.
    let _ = events
        .send(UpstreamEvent::Closed {
            code: None,
            reason: String::new(),
        })
        .await;
}

async fn forward_if_result(text: &str, events: &mpsc::Sender<UpstreamEvent>) {
    if let Some(event) = parse_recognition_event(text) {
        let _ = events.send(UpstreamEvent::Result(event)).await;
    }
}
