//! Transcript segmentation state
//!
//! `Segmenter` is the pure core of the turn segmentation engine: it tracks
//! the committed/live text buffers and decides what a commit would produce.
//! It knows nothing about timers or tasks, which keeps every transition
//! directly callable from unit tests; `TurnEngine` supplies the clock.

/// Per-session transcript buffers.
///
/// `committed` only grows by append until a commit flushes it; `live` is
/// replaced wholesale by each interim hypothesis.
#[derive(Debug, Default)]
pub struct Segmenter {
    committed: String,
    live: String,
    last_final: String,
    last_committed: String,
    heard: bool,
}

impl Segmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one recognition event into the buffers.
    ///
    /// Returns `true` when the event counted as speech activity, i.e. the
    /// caller should reset its inactivity timer. Empty transcripts and
    /// repeated final fragments do not count.
    pub fn observe(&mut self, is_final: bool, transcript: &str) -> bool {
        if transcript.is_empty() {
            return false;
        }

        if is_final {
            if transcript.trim() == self.last_final.trim() {
                return false;
            }
            self.last_final = transcript.to_string();
            self.committed.push_str(transcript);
            if !transcript.ends_with(' ') {
                self.committed.push(' ');
            }
            self.live.clear();
        } else {
            self.live = transcript.to_string();
        }

        self.heard = true;
        true
    }

    /// The inactivity-commit decision: what a firing timer would flush.
    ///
    /// `None` when nothing was heard since the last commit, when the buffers
    /// are empty, or when the candidate matches the previously committed
    /// turn. A successful take clears the buffers.
    pub fn take_pending(&mut self) -> Option<String> {
        if !self.heard {
            return None;
        }

        let candidate = self.candidate();
        if candidate.is_empty() {
            return None;
        }
        if candidate == self.last_committed {
            self.heard = false;
            return None;
        }

        self.heard = false;
        self.flush_buffers();
        self.last_committed = candidate.clone();
        Some(candidate)
    }

    /// The stop-path commit: bypasses the heard flag and always clears the
    /// buffers, committing whatever text was pending.
    pub fn force_take(&mut self) -> Option<String> {
        let candidate = self.candidate();
        self.heard = false;
        self.flush_buffers();

        if candidate.is_empty() || candidate == self.last_committed {
            return None;
        }
        self.last_committed = candidate.clone();
        Some(candidate)
    }

    /// Live view of the pending text (committed plus interim), for display.
    pub fn preview(&self) -> String {
        self.candidate()
    }

    /// Forget everything, including the last committed turn text.
    pub fn reset(&mut self) {
        self.flush_buffers();
        self.last_committed.clear();
        self.heard = false;
    }

    fn candidate(&self) -> String {
        format!("{} {}", self.committed.trim(), self.live.trim())
            .trim()
            .to_string()
    }

    fn flush_buffers(&mut self) {
        self.committed.clear();
        self.live.clear();
        self.last_final.clear();
    }
}
