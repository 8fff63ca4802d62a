//! Response/suggestion collaborator
//!
//! After every committed turn the engine refreshes two suggestion sets for
//! the user: three candidate full-sentence responses and an eight-word
//! next-word grid. The remote generator is a black box behind `Suggester`;
//! when it fails or under-delivers, local heuristics fill in.

pub mod client;
pub mod heuristics;

use crate::turns::Turn;
use anyhow::Result;

pub use client::RemoteSuggester;
pub use heuristics::HeuristicSuggester;

/// Number of candidate full-sentence responses offered per refresh.
pub const FULL_RESPONSE_COUNT: usize = 3;
/// Number of dynamic words in the next-word grid.
pub const WORD_GRID_SIZE: usize = 8;

/// Suggestion sets published after a committed turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Suggestions {
    pub sentences: Vec<String>,
    pub words: Vec<String>,
}

/// The suggestion generator interface. Implementations must tolerate being
/// called with an empty turn list.
#[async_trait::async_trait]
pub trait Suggester: Send + Sync {
    /// Three candidate full-sentence responses for the local user.
    async fn full_responses(&self, turns: &[Turn], image_url: Option<&str>) -> Result<Vec<String>>;

    /// Up to eight candidate next words for the sentence being composed.
    async fn word_grid(&self, turns: &[Turn], prefix: &str) -> Result<Vec<String>>;
}
