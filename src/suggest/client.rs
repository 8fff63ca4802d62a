//! Remote suggestion generator client
//!
//! Talks to an OpenAI-style chat-completions endpoint and asks for either
//! three candidate full-sentence responses or a grid of next words, both
//! returned pipe-separated. Callers treat any failure as "fall back to
//! heuristics", so errors here are ordinary `Result`s, never fatal.

use super::{Suggester, FULL_RESPONSE_COUNT, WORD_GRID_SIZE};
use crate::config::SuggestSettings;
use crate::turns::{Speaker, Turn};
use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

pub struct RemoteSuggester {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    max_context_chars: usize,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl RemoteSuggester {
    pub fn new(settings: &SuggestSettings, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: settings.base_url.clone(),
            model: settings.model.clone(),
            api_key,
            max_context_chars: settings.max_context_chars,
        }
    }

    async fn chat(&self, system: &str, user: String, max_tokens: u32) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": 0.4,
            "top_p": 0.9,
            "max_tokens": max_tokens,
            "frequency_penalty": 0.3,
        });

        let response = self
            .http
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("suggestion request failed")?;
        ensure!(
            response.status().is_success(),
            "suggestion endpoint returned {}",
            response.status()
        );

        let parsed: ChatResponse = response
            .json()
            .await
            .context("malformed suggestion response")?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl Suggester for RemoteSuggester {
    async fn full_responses(&self, turns: &[Turn], image_url: Option<&str>) -> Result<Vec<String>> {
        let context = serialize_context(turns, self.max_context_chars);
        let latest = last_remote_turn(turns);
        let mut user = format!(
            "Conversation so far:\n{context}\n\nThe other person just said: \"{latest}\"\n\
             Reply with exactly three short candidate responses, pipe-separated."
        );
        if let Some(url) = image_url {
            user.push_str(&format!("\nImage context: {url}"));
        }

        let system = "You help a user (A) communicate in short, natural sentences. \
                      Offer three distinct, complete replies A could say next. \
                      Output only the three sentences separated by |.";

        let content = self.chat(system, user, 128).await?;
        let sentences = parse_pipe_list(&content, FULL_RESPONSE_COUNT);
        debug!(count = sentences.len(), "remote full responses");
        Ok(sentences)
    }

    async fn word_grid(&self, turns: &[Turn], prefix: &str) -> Result<Vec<String>> {
        let context = serialize_context(turns, self.max_context_chars);
        let user = format!(
            "Conversation so far:\n{context}\n\nA has typed so far: \"{prefix}\"\n\
             Suggest the eight most likely single next words, pipe-separated."
        );

        let system = "You predict the next single word for a user composing a sentence. \
                      Output only eight single words separated by |.";

        let content = self.chat(system, user, 64).await?;
        Ok(parse_pipe_words(&content, WORD_GRID_SIZE))
    }
}

/// Represent the conversation as labeled lines, newest last, clamped from
/// the front to keep the prompt small.
fn serialize_context(turns: &[Turn], max_chars: usize) -> String {
    let lines: Vec<String> = turns
        .iter()
        .map(|t| {
            let label = match t.speaker {
                Speaker::A => "A",
                Speaker::B => "B",
            };
            format!("({label}) {}", t.text.trim())
        })
        .collect();
    let joined = lines.join("\n");
    if joined.len() > max_chars {
        let start = joined.len() - max_chars;
        // Clamp on a char boundary.
        let start = (start..joined.len())
            .find(|i| joined.is_char_boundary(*i))
            .unwrap_or(joined.len());
        joined[start..].to_string()
    } else {
        joined
    }
}

fn last_remote_turn(turns: &[Turn]) -> String {
    turns
        .iter()
        .rev()
        .find(|t| t.speaker == Speaker::B)
        .map(|t| t.text.trim().to_string())
        .unwrap_or_default()
}

/// "sent1 | sent2 | sent3" into at most `max` trimmed entries.
fn parse_pipe_list(s: &str, max: usize) -> Vec<String> {
    s.split('|')
        .map(|x| x.trim())
        .filter(|x| !x.is_empty())
        .take(max)
        .map(|x| x.to_string())
        .collect()
}

/// Like `parse_pipe_list` but normalizes commas/newlines to pipes and keeps
/// only plausible single words.
fn parse_pipe_words(s: &str, max: usize) -> Vec<String> {
    s.replace(['\n', ','], "|")
        .split('|')
        .map(|w| w.trim().trim_matches(|c: char| !c.is_alphanumeric() && c != '\''))
        .filter(|w| {
            !w.is_empty() && w.len() <= 30 && w.chars().any(|c| c.is_alphanumeric())
        })
        .take(max)
        .map(|w| w.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(speaker: Speaker, text: &str) -> Turn {
        Turn::ended(speaker, text.to_string())
    }

    #[test]
    fn test_serialize_context_labels_and_order() {
        let turns = vec![turn(Speaker::B, "how are you"), turn(Speaker::A, "fine")];
        let ctx = serialize_context(&turns, 1800);
        assert_eq!(ctx, "(B) how are you\n(A) fine");
    }

    #[test]
    fn test_serialize_context_clamps_from_front() {
        let turns = vec![turn(Speaker::B, "aaaaaaaaaa"), turn(Speaker::B, "bbbb")];
        let ctx = serialize_context(&turns, 8);
        assert!(ctx.len() <= 8);
        assert!(ctx.ends_with("bbbb"));
    }

    #[test]
    fn test_parse_pipe_list() {
        let parsed = parse_pipe_list("How are you? | I need help. |  | Can we go?", 3);
        assert_eq!(parsed, vec!["How are you?", "I need help.", "Can we go?"]);
    }

    #[test]
    fn test_parse_pipe_list_caps_entries() {
        let parsed = parse_pipe_list("a|b|c|d|e", 3);
        assert_eq!(parsed.len(), 3);
    }

    #[test]
    fn test_parse_pipe_words_normalizes_separators() {
        let parsed = parse_pipe_words("go, eat\nsleep | play!", 8);
        assert_eq!(parsed, vec!["go", "eat", "sleep", "play"]);
    }

    #[test]
    fn test_parse_pipe_words_drops_punctuation_only_tokens() {
        let parsed = parse_pipe_words("hello | ?! | world", 8);
        assert_eq!(parsed, vec!["hello", "world"]);
    }

    #[test]
    fn test_last_remote_turn_picks_latest_b() {
        let turns = vec![
            turn(Speaker::B, "first"),
            turn(Speaker::A, "reply"),
            turn(Speaker::B, "second"),
        ];
        assert_eq!(last_remote_turn(&turns), "second");
    }
}
