//! Capture session transport
//!
//! The controller talks to the relay through `SessionLink`, so unit tests
//! can drive it with channel-backed fakes instead of a live socket. The
//! real implementation is a tokio-tungstenite WebSocket client.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One open session to the relay.
#[async_trait]
pub trait SessionLink: Send {
    /// Send one opaque binary audio chunk. Chunks sent after the link
    /// closed are dropped, not errors.
    async fn send_chunk(&mut self, chunk: Vec<u8>) -> Result<()>;

    /// Next text payload relayed from the recognizer; `None` once the
    /// session has closed.
    async fn next_message(&mut self) -> Option<Result<String>>;

    /// Close the session. Safe to call repeatedly.
    async fn close(&mut self);
}

/// Opens sessions; the seam that lets tests skip real networking.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn SessionLink>>;
}

pub struct WsSessionConnector {
    url: String,
}

impl WsSessionConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl SessionConnector for WsSessionConnector {
    async fn connect(&self) -> Result<Box<dyn SessionLink>> {
        let (stream, _) = connect_async(&self.url)
            .await
            .with_context(|| format!("failed to open session to {}", self.url))?;
        debug!(url = %self.url, "session connected");
        let (sink, source) = stream.split();
        Ok(Box::new(WsSessionLink {
            sink: Some(sink),
            source,
        }))
    }
}

pub struct WsSessionLink {
    sink: Option<SplitSink<WsStream, Message>>,
    source: SplitStream<WsStream>,
}

#[async_trait]
impl SessionLink for WsSessionLink {
    async fn send_chunk(&mut self, chunk: Vec<u8>) -> Result<()> {
        let Some(sink) = self.sink.as_mut() else {
            return Ok(());
        };
        sink.send(Message::Binary(chunk.into()))
            .await
            .context("session send failed")
    }

    async fn next_message(&mut self) -> Option<Result<String>> {
        while let Some(frame) = self.source.next().await {
            match frame {
                Ok(Message::Text(text)) => return Some(Ok(text.to_string())),
                // Normalize binary payloads to text, mirroring the text
                // path; undecodable frames are dropped.
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => continue,
                },
                Ok(Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(err) => return Some(Err(err.into())),
            }
        }
        None
    }

    async fn close(&mut self) {
        if let Some(mut sink) = self.sink.take() {
            let _ = sink.send(Message::Close(None)).await;
            let _ = sink.close().await;
        }
    }
}
