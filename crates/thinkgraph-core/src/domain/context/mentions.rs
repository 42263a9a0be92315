//! Mention extraction from conversational input
//!
//! Mentions are the union of extractor entity names, capitalized sequences,
//! quoted substrings and well-known acronyms, deduplicated case-insensitively.

use regex::Regex;
use std::collections::HashSet;

use crate::domain::extraction::EntityExtractor;
use crate::domain::extraction::scoring::is_noise;
use crate::error::{Error, Result};

const CAPITALIZED_PATTERN: &str = r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\b";
const DOUBLE_QUOTED_PATTERN: &str = r#""([^"]+)""#;
const ACRONYM_PATTERN: &str = r"(?i)\b(?:AI|ML|API|GPU|CPU|HTTP|JSON|XML|SQL|NoSQL)\b";

/// Mentions this short or shorter are dropped
const MIN_MENTION_CHARS: usize = 2;

/// Compiled mention heuristics
#[derive(Debug, Clone)]
pub struct MentionExtractor {
    capitalized: Regex,
    double_quoted: Regex,
    acronyms: Regex,
}

impl MentionExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            capitalized: compile("capitalized", CAPITALIZED_PATTERN)?,
            double_quoted: compile("quoted", DOUBLE_QUOTED_PATTERN)?,
            acronyms: compile("acronyms", ACRONYM_PATTERN)?,
        })
    }

    /// Up to `limit` distinct mentions in discovery order, first casing kept
    pub fn extract(&self, extractor: &EntityExtractor, text: &str, limit: usize) -> Vec<String> {
        if text.trim().is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut candidates: Vec<String> = extractor.extract_entities_with_confidence(text).entity_names();

        candidates.extend(self.capitalized.find_iter(text).map(|m| m.as_str().to_string()));
        candidates.extend(
            self.double_quoted
                .captures_iter(text)
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str().to_string()),
        );
        candidates.extend(single_quoted(text).into_iter().map(str::to_string));
        candidates.extend(self.acronyms.find_iter(text).map(|m| m.as_str().to_string()));

        let mut seen = HashSet::new();
        let mut mentions = Vec::new();
        for candidate in candidates {
            let trimmed = candidate.trim();
            if trimmed.chars().count() <= MIN_MENTION_CHARS || is_noise(trimmed) {
                continue;
            }
            if seen.insert(trimmed.to_lowercase()) {
                mentions.push(trimmed.to_string());
                if mentions.len() >= limit {
                    break;
                }
            }
        }
        mentions
    }
}

fn compile(name: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::InvalidPattern {
        category: name.to_string(),
        message: e.to_string(),
    })
}

/// Single-quoted spans whose quotes sit on word boundaries, so apostrophes
/// inside words ("don't") never open or close a span
pub(crate) fn single_quoted(text: &str) -> Vec<&str> {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let quotes: Vec<usize> = text.match_indices('\'').map(|(i, _)| i).collect();

    let mut spans = Vec::new();
    let mut i = 0;
    while i < quotes.len() {
        let open = quotes[i];
        let opens = !text[..open].chars().next_back().is_some_and(is_word);
        if !opens {
            i += 1;
            continue;
        }

        let close = quotes[i + 1..].iter().position(|&close| {
            !text[close + 1..].chars().next().is_some_and(is_word)
        });
        match close {
            Some(offset) => {
                let close_index = i + 1 + offset;
                let inner = &text[open + 1..quotes[close_index]];
                if !inner.trim().is_empty() && !inner.contains('\n') {
                    spans.push(inner);
                    i = close_index + 1;
                } else {
                    i += 1;
                }
            }
            None => break,
        }
    }
    spans
}
