//! Entity name detection in free text
//!
//! Detection sits behind [`EntityNameDetector`] so the regex heuristics can
//! be swapped for a model-backed extractor without touching enrichment.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Finds candidate entity names in a chunk of text
pub trait EntityNameDetector: Send + Sync {
    /// Candidate names in detection order, de-duplicated case-insensitively
    /// and capped at `limit`
    fn detect(&self, text: &str, limit: usize) -> Vec<String>;
}

/// Two or more consecutive capitalised words ("Dark Lord", "King Arthur")
static CAPITALIZED_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\p{Lu}[\w'-]*(?:\s+\p{Lu}[\w'-]*)+\b").expect("valid regex")
});

/// Text between straight or curly double quotes
static QUOTED_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"\n]{2,60})"|“([^”\n]{2,60})”"#).expect("valid regex"));

/// A single capitalised token
static CAPITALIZED_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\p{Lu}[\w'-]+\b").expect("valid regex"));

/// Capitalised words that are almost never names
const COMMON_WORDS: &[&str] = &[
    "a", "an", "the", "and", "but", "or", "if", "then", "when", "while", "after", "before",
    "he", "she", "it", "they", "we", "i", "you", "his", "her", "its", "their", "our", "my",
    "this", "that", "these", "those", "there", "here", "in", "on", "at", "to", "from", "of",
    "with", "by", "for", "as", "is", "was", "were", "are", "be", "not", "no", "yes", "so",
    "what", "who", "why", "how", "where", "which", "once", "meanwhile", "later", "suddenly",
];

fn is_common_word(word: &str) -> bool {
    COMMON_WORDS.contains(&word.to_lowercase().as_str())
}

/// Regex heuristics: capitalised runs, quoted spans, then capitalised words
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicNameDetector;

impl HeuristicNameDetector {
    pub fn new() -> Self {
        Self
    }
}

impl EntityNameDetector for HeuristicNameDetector {
    fn detect(&self, text: &str, limit: usize) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        let mut push = |candidate: &str| {
            let candidate = candidate.trim();
            if candidate.is_empty() || candidates.len() >= limit {
                return;
            }
            if seen.insert(candidate.to_lowercase()) {
                candidates.push(candidate.to_string());
            }
        };

        for run in CAPITALIZED_RUN.find_iter(text) {
            // drop a sentence-initial function word: "The Dark Lord" -> "Dark Lord"
            let words: Vec<&str> = run.as_str().split_whitespace().collect();
            let start = usize::from(is_common_word(words[0]));
            if words.len() - start >= 2 {
                push(&words[start..].join(" "));
            }
        }

        for quoted in QUOTED_SPAN.captures_iter(text) {
            if let Some(span) = quoted.get(1).or_else(|| quoted.get(2)) {
                push(span.as_str());
            }
        }

        for word in CAPITALIZED_WORD.find_iter(text) {
            if !is_common_word(word.as_str()) {
                push(word.as_str());
            }
        }

        candidates
    }
}
