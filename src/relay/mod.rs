//! Realtime transcription relay
//!
//! This module bridges one client WebSocket with one upstream streaming
//! recognizer connection per session:
//! - `wire`: recognizer frame parsing into normalized `RecognitionEvent`s
//! - `upstream`: the adapter owning the recognizer connection
//! - `session`: the pairing, forwarding rules, and joint teardown

pub mod session;
pub mod upstream;
pub mod wire;

pub use session::{RelaySession, SessionState};
pub use upstream::{UpstreamAdapter, UpstreamEvent};
pub use wire::{parse_recognition_event, RecognitionEvent};
