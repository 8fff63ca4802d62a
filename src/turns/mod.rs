//! Turn segmentation
//!
//! Converts the live recognition stream into discrete conversational turns:
//! - `turn`: the `Turn`/`Conversation` data model with duplicate suppression
//! - `segmenter`: the pure buffer/commit state machine
//! - `engine`: the per-session actor that adds the inactivity clock and
//!   notifies the suggestion collaborator after each commit

pub mod engine;
pub mod segmenter;
pub mod turn;

pub use engine::{TurnEngine, TurnEngineConfig, TurnEngineHandle, DEFAULT_INACTIVITY};
pub use segmenter::Segmenter;
pub use turn::{Conversation, Speaker, Turn};
