//! Local suggestion heuristics
//!
//! Keeps the word grid and response cards populated when the remote
//! generator is unreachable or returns too little. Purely lexical, no
//! network.

use super::{Suggester, WORD_GRID_SIZE};
use crate::turns::Turn;
use anyhow::Result;

const SENTENCE_STARTERS: &[&str] = &[
    "I", "Maybe", "Please", "Yes", "No", "Sorry", "Thank", "Could",
];
const AFTER_I: &[&str] = &[
    "am", "need", "want", "can", "will", "was", "have", "think",
];
const AFTER_YOU: &[&str] = &[
    "are", "can", "will", "should", "have", "were", "need", "want",
];
const AFTER_DETERMINER: &[&str] = &["time", "way", "thing", "person", "place", "idea", "one"];
const FUNCTION_WORDS: &[&str] = &[
    "and", "to", "of", "that", "is", "it", "in", "for", "on", "with", "as", "but", "or", "if",
    "so", "then", "when", "because", "can", "will", "would", "should", "have", "has", "had",
    "do", "does", "did",
];
const DETERMINERS: &[&str] = &[
    "the", "a", "an", "this", "that", "these", "those", "my", "your", "his", "her", "our",
    "their",
];

/// Predict likely next words for the sentence the user is composing.
pub fn next_words(prefix: &str) -> Vec<String> {
    let trimmed = prefix.trim_end();

    if trimmed.trim().is_empty() || ends_sentence(trimmed) {
        return take(SENTENCE_STARTERS);
    }

    let last = last_word(trimmed).to_lowercase();
    if last == "i" {
        return take(AFTER_I);
    }
    if last == "you" {
        return take(AFTER_YOU);
    }
    if DETERMINERS.contains(&last.as_str()) {
        return take(AFTER_DETERMINER);
    }

    take(FUNCTION_WORDS)
}

/// Canned response cards used when generation fails.
pub fn fallback_sentences() -> Vec<String> {
    vec![
        "Can you repeat that?".to_string(),
        "That helps. Let me think.".to_string(),
        "Thanks, could you clarify that?".to_string(),
    ]
}

fn ends_sentence(text: &str) -> bool {
    let text = text.strip_suffix('"').unwrap_or(text);
    text.ends_with('.') || text.ends_with('!') || text.ends_with('?')
}

fn last_word(text: &str) -> &str {
    let end = text.len();
    let start = text
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_alphabetic() || *c == '\'')
        .last()
        .map(|(i, _)| i)
        .unwrap_or(end);
    &text[start..end]
}

fn take(words: &[&str]) -> Vec<String> {
    words
        .iter()
        .take(WORD_GRID_SIZE)
        .map(|w| w.to_string())
        .collect()
}

/// Offline implementation of the suggestion collaborator.
pub struct HeuristicSuggester;

#[async_trait::async_trait]
impl Suggester for HeuristicSuggester {
    async fn full_responses(&self, _turns: &[Turn], _image_url: Option<&str>) -> Result<Vec<String>> {
        Ok(fallback_sentences())
    }

    async fn word_grid(&self, _turns: &[Turn], prefix: &str) -> Result<Vec<String>> {
        Ok(next_words(prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_prefix_offers_sentence_starters() {
        assert_eq!(next_words(""), take(SENTENCE_STARTERS));
        assert_eq!(next_words("   "), take(SENTENCE_STARTERS));
    }

    #[test]
    fn test_finished_sentence_offers_starters() {
        assert_eq!(next_words("I am done."), take(SENTENCE_STARTERS));
        assert_eq!(next_words("Really?\""), take(SENTENCE_STARTERS));
    }

    #[test]
    fn test_after_pronouns() {
        assert_eq!(next_words("I"), take(AFTER_I));
        assert_eq!(next_words("well you"), take(AFTER_YOU));
    }

    #[test]
    fn test_after_determiner() {
        assert_eq!(next_words("I found the"), take(AFTER_DETERMINER));
        assert_eq!(next_words("it was my"), take(AFTER_DETERMINER));
    }

    #[test]
    fn test_fallback_is_function_words() {
        let words = next_words("we went");
        assert_eq!(words.len(), WORD_GRID_SIZE);
        assert_eq!(words[0], "and");
    }
}
