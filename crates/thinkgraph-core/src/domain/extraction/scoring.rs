//! Confidence heuristics
//!
//! All scores are rounded to three decimals before clamping so that sums such
//! as `0.5 + 0.1 + 0.1` compare equal to a `0.7` threshold.

use super::patterns::{DEFINITION_INDICATORS, KeywordGroup, is_stop_word};

const ENTITY_BASE_SCORE: f32 = 0.5;
const DEFINITION_BASE_SCORE: f32 = 0.6;

/// Longest entity text before the length penalty applies
const LONG_ENTITY_CHARS: usize = 20;

/// Token count above which a candidate is treated as run-on noise
const MAX_ENTITY_TOKENS: usize = 5;

/// Score an entity candidate from its text, context window and category keywords
pub fn calculate_confidence_score(entity: &str, context: &str, keywords: &[KeywordGroup]) -> f32 {
    let mut score = ENTITY_BASE_SCORE;
    let len = entity.chars().count();

    if len < 3 {
        score -= 0.2;
    } else if len > LONG_ENTITY_CHARS {
        score -= 0.1;
    }

    if starts_uppercase(entity) {
        score += 0.1;
    }
    if is_title_case(entity) {
        score += 0.1;
    }

    let context_lower = context.to_lowercase();
    for group in keywords {
        if group.matches(&context_lower) {
            score += group.bonus;
        }
    }

    if is_stop_word(&entity.to_lowercase()) {
        score -= 0.5;
    }
    if entity.split_whitespace().count() > MAX_ENTITY_TOKENS {
        score -= 0.2;
    }

    finalize(score)
}

/// Score a definition candidate; `matched` is the whole matched fragment
pub fn calculate_definition_confidence(term: &str, definition: &str, matched: &str) -> f32 {
    let mut score = DEFINITION_BASE_SCORE;

    if term.split_whitespace().count() <= 3 {
        score += 0.1;
    }
    if is_title_case(term) {
        score += 0.1;
    }

    let def_len = definition.chars().count();
    if def_len > 20 {
        score += 0.1;
    }
    if def_len > 50 {
        score += 0.1;
    }

    let matched_lower = matched.to_lowercase();
    if DEFINITION_INDICATORS.iter().any(|p| matched_lower.contains(p)) {
        score += 0.1;
    }

    finalize(score)
}

/// Whether a candidate is noise: a stop word, a single character, all digits, or all punctuation
pub fn is_noise(entity: &str) -> bool {
    let trimmed = entity.trim();
    if trimmed.chars().count() < 2 {
        return true;
    }
    if is_stop_word(&trimmed.to_lowercase()) {
        return true;
    }
    if trimmed.chars().all(|c| c.is_numeric()) {
        return true;
    }
    trimmed
        .chars()
        .all(|c| !(c.is_alphanumeric() || c == '_' || c.is_whitespace()))
}

pub fn starts_uppercase(text: &str) -> bool {
    text.chars().next().is_some_and(char::is_uppercase)
}

/// Title case: every cased run starts with one uppercase letter followed by lowercase letters
pub fn is_title_case(text: &str) -> bool {
    let mut has_cased = false;
    let mut previous_cased = false;

    for c in text.chars() {
        if c.is_uppercase() {
            if previous_cased {
                return false;
            }
            previous_cased = true;
            has_cased = true;
        } else if c.is_lowercase() {
            if !previous_cased {
                return false;
            }
            previous_cased = true;
            has_cased = true;
        } else {
            previous_cased = false;
        }
    }

    has_cased
}

fn finalize(score: f32) -> f32 {
    ((score * 1000.0).round() / 1000.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people_keywords() -> Vec<KeywordGroup> {
        vec![
            KeywordGroup::new(&["said", "discussed", "dr."], 0.2),
            KeywordGroup::new(&["university", "research"], 0.1),
        ]
    }

    #[test]
    fn test_title_case() {
        assert!(is_title_case("Alice Smith"));
        assert!(is_title_case("Python"));
        assert!(!is_title_case("MIT"));
        assert!(!is_title_case("machine learning"));
        assert!(!is_title_case("Machine learning"));
        assert!(!is_title_case("Node.js"));
        assert!(!is_title_case("2024"));
    }

    #[test]
    fn test_noise_filter() {
        assert!(is_noise("the"));
        assert!(is_noise("The"));
        assert!(is_noise("x"));
        assert!(is_noise("2024"));
        assert!(is_noise("--!"));
        assert!(!is_noise("Rust"));
        assert!(!is_noise("C++"));
    }

    #[test]
    fn test_context_keywords_boost_score() {
        let plain = calculate_confidence_score("Alice Smith", "Alice Smith", &people_keywords());
        let boosted = calculate_confidence_score(
            "Alice Smith",
            "Dr. Alice Smith discussed research",
            &people_keywords(),
        );
        assert_eq!(plain, 0.7);
        assert_eq!(boosted, 1.0);
    }

    #[test]
    fn test_stop_word_penalty() {
        let score = calculate_confidence_score("The", "The", &[]);
        assert_eq!(score, 0.2);
    }

    #[test]
    fn test_score_is_clamped() {
        let keywords = vec![
            KeywordGroup::new(&["a"], 0.5),
            KeywordGroup::new(&["b"], 0.5),
        ];
        assert_eq!(calculate_confidence_score("Alpha", "a b", &keywords), 1.0);

        let penalty = calculate_confidence_score("a", "", &[]);
        assert!((0.0..=1.0).contains(&penalty));
        assert_eq!(penalty, 0.0);
    }

    #[test]
    fn test_long_and_run_on_candidates_penalized() {
        let long = calculate_confidence_score("Supercalifragilisticexpialidocious", "", &[]);
        assert_eq!(long, 0.6);
        let run_on = calculate_confidence_score("one two three four five six", "", &[]);
        assert_eq!(run_on, 0.2);
    }

    #[test]
    fn test_definition_confidence() {
        let score = calculate_definition_confidence(
            "Rust",
            "a language focused on memory safety without a garbage collector",
            "Rust means a language focused on memory safety without a garbage collector",
        );
        // base + short term + title + >20 + >50 + indicator
        assert_eq!(score, 1.0);

        let minimal = calculate_definition_confidence("some long multi word term", "short text", "x");
        assert_eq!(minimal, 0.6);
    }
}
