//! Recognizer wire messages
//!
//! The upstream recognizer streams JSON frames. Only frames whose `type`
//! discriminator is `"Results"` matter to us; the transcript is the first
//! entry of the channel's alternatives array. Everything else (metadata,
//! utterance markers, malformed payloads) is dropped without error.

use serde::Deserialize;

/// Message type discriminator for recognition results.
pub const RESULTS_TYPE: &str = "Results";

/// A normalized recognition result projected out of one upstream frame.
///
/// `raw` keeps the verbatim JSON text so the relay can forward results to
/// clients without reframing them.
#[derive(Debug, Clone)]
pub struct RecognitionEvent {
    pub is_final: bool,
    pub transcript: String,
    pub raw: String,
}

#[derive(Debug, Deserialize)]
struct ResultsFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    is_final: bool,
    channel: Option<Channel>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
}

/// Parse one upstream text frame into a `RecognitionEvent`.
///
/// Returns `None` for non-Results frames and for anything that does not
/// parse; callers treat that as "drop silently".
pub fn parse_recognition_event(raw: &str) -> Option<RecognitionEvent> {
    let frame: ResultsFrame = serde_json::from_str(raw).ok()?;
    if frame.kind != RESULTS_TYPE {
        return None;
    }

    let transcript = frame
        .channel
        .and_then(|c| c.alternatives.into_iter().next())
        .map(|a| a.transcript)
        .unwrap_or_default();

    Some(RecognitionEvent {
        is_final: frame.is_final,
        transcript,
        raw: raw.to_string(),
    })
}
