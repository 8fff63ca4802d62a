use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Conversation participant. `A` is the local user (typed or spoken output),
/// `B` is the remote voice picked up by transcription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    A,
    B,
}

/// One attributed, finalized span of conversation text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub ended: bool,
}

impl Turn {
    pub fn ended(speaker: Speaker, text: String) -> Self {
        Self {
            speaker,
            text,
            timestamp: Utc::now(),
            ended: true,
        }
    }
}

/// Ordered, append-only turn list.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    /// Append a turn unless it duplicates the immediately preceding turn
    /// (same speaker, identical trimmed text). Returns whether it was
    /// appended. The comparison deliberately looks only one turn back.
    pub fn push_deduped(&mut self, turn: Turn) -> bool {
        if let Some(last) = self.turns.last() {
            if last.speaker == turn.speaker && last.text.trim() == turn.text.trim() {
                return false;
            }
        }
        self.turns.push(turn);
        true
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
