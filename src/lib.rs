pub mod capture;
pub mod config;
pub mod http;
pub mod relay;
pub mod suggest;
pub mod turns;

pub use capture::{CaptureController, CaptureState, MicSource, SessionConnector, SessionLink};
pub use config::Config;
pub use http::{create_router, AppState};
pub use relay::{RecognitionEvent, RelaySession, SessionState, UpstreamAdapter, UpstreamEvent};
pub use suggest::{Suggester, Suggestions};
pub use turns::{Conversation, Speaker, Turn, TurnEngine, TurnEngineConfig, TurnEngineHandle};
