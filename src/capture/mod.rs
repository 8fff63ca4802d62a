//! Client capture
//!
//! Everything the client side needs for one recording session:
//! - `mic`: microphone acquisition and fixed-interval chunking
//! - `link`: the WebSocket session to the relay (behind a trait seam)
//! - `controller`: the idle/connecting/streaming state machine tying the
//!   two together and feeding the turn engine

pub mod controller;
pub mod link;
pub mod mic;

pub use controller::{CaptureController, CaptureState};
pub use link::{SessionConnector, SessionLink, WsSessionConnector};
pub use mic::{CpalMicSource, MicSource};
