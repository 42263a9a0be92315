//! Thought relevance ranking and context summaries

use std::cmp::Ordering;
use std::collections::HashSet;

use super::types::{NO_CONTEXT_SUMMARY, RelatedEntity, RelatedThought, SimilarSession};

/// Bonus per mention that appears with its exact casing
const EXACT_CASE_BONUS: f32 = 0.2;

/// Fraction of mentions found in `content`, plus an exact-case bonus, capped at 1.0
pub fn calculate_thought_relevance(content: &str, mentions: &[String]) -> f32 {
    if content.is_empty() || mentions.is_empty() {
        return 0.0;
    }

    let content_lower = content.to_lowercase();
    let matches = mentions
        .iter()
        .filter(|m| content_lower.contains(&m.to_lowercase()))
        .count();
    let exact = mentions.iter().filter(|m| content.contains(m.as_str())).count();

    let score = matches as f32 / mentions.len() as f32 + EXACT_CASE_BONUS * exact as f32;
    score.min(1.0)
}

/// Truncate to `max_chars` characters, marking the cut with an ellipsis
pub fn truncate_for_display(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

/// Sort candidates by relevance then recency, drop repeats, keep the top `limit`
pub fn rank_thoughts(mut candidates: Vec<RelatedThought>, limit: usize) -> Vec<RelatedThought> {
    candidates.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.timestamp.cmp(&a.timestamp))
    });

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|t| seen.insert((t.content.clone(), t.session_id.clone())))
        .take(limit)
        .collect()
}

/// One-line description of what context was found
pub fn generate_context_summary(
    entities: &[RelatedEntity],
    thoughts: &[RelatedThought],
    sessions: &[SimilarSession],
) -> String {
    if entities.is_empty() && thoughts.is_empty() {
        return NO_CONTEXT_SUMMARY.to_string();
    }

    let mut parts = Vec::new();
    if !entities.is_empty() {
        let names: Vec<&str> = entities.iter().take(3).map(|e| e.name.as_str()).collect();
        parts.push(format!("Previously discussed: {}", names.join(", ")));
    }
    if !thoughts.is_empty() {
        parts.push(format!("{} related insights found", thoughts.len()));
    }
    if !sessions.is_empty() {
        parts.push(format!("{} related conversations", sessions.len()));
    }
    format!("{}.", parts.join(". "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::context::types::ThoughtSource;
    use crate::domain::graph::ThoughtType;
    use chrono::{Duration, Utc};

    fn thought(content: &str, session: &str, relevance: f32, age_secs: i64) -> RelatedThought {
        RelatedThought {
            content: content.to_string(),
            thought_type: ThoughtType::Analysis,
            confidence: 0.8,
            timestamp: Utc::now() - Duration::seconds(age_secs),
            session_id: session.to_string(),
            relevance_score: relevance,
            source: ThoughtSource::Entity,
            mentioned_entities: Vec::new(),
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_relevance_bounds() {
        assert_eq!(calculate_thought_relevance("", &names(&["Rust"])), 0.0);
        assert_eq!(calculate_thought_relevance("Rust is fast", &[]), 0.0);
        assert_eq!(calculate_thought_relevance("nothing here", &names(&["Rust"])), 0.0);

        // 1/1 match plus exact bonus is capped
        assert_eq!(calculate_thought_relevance("Rust is fast", &names(&["Rust"])), 1.0);
    }

    #[test]
    fn test_relevance_partial_match() {
        let mentions = names(&["Rust", "Tokio"]);
        // One case-insensitive match, no exact-case match
        let score = calculate_thought_relevance("rust ownership rules", &mentions);
        assert!((score - 0.5).abs() < 1e-6);

        // One match, exact case
        let score = calculate_thought_relevance("Rust ownership rules", &mentions);
        assert!((score - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_truncate_for_display() {
        assert_eq!(truncate_for_display("short", 10), "short");
        assert_eq!(truncate_for_display("abcdef", 3), "abc...");
        assert_eq!(truncate_for_display("ééééé", 2), "éé...");
    }

    #[test]
    fn test_rank_orders_and_dedupes() {
        let ranked = rank_thoughts(
            vec![
                thought("older strong thought", "s1", 0.9, 100),
                thought("weak thought content", "s1", 0.3, 0),
                thought("newer strong thought", "s1", 0.9, 10),
                thought("newer strong thought", "s1", 0.9, 10),
            ],
            5,
        );
        let contents: Vec<_> = ranked.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["newer strong thought", "older strong thought", "weak thought content"]
        );
    }

    #[test]
    fn test_rank_limit() {
        let candidates = (0..8)
            .map(|i| thought(&format!("thought number {}", i), "s1", 0.5, i))
            .collect();
        assert_eq!(rank_thoughts(candidates, 5).len(), 5);
    }

    #[test]
    fn test_summary_formats() {
        assert_eq!(generate_context_summary(&[], &[], &[]), NO_CONTEXT_SUMMARY);

        let entity = RelatedEntity {
            name: "Rust".into(),
            entity_types: vec!["Entity".into()],
            definition: None,
            mention_count: 2,
            related_concepts: Vec::new(),
        };
        let session = SimilarSession {
            session_id: "s2".into(),
            strategy: "sequential".into(),
            domain: "general".into(),
            entity_overlap: 1,
            sample_thoughts: Vec::new(),
        };
        let thoughts = vec![thought("a thought about Rust", "s1", 1.0, 0)];

        assert_eq!(
            generate_context_summary(&[entity.clone()], &thoughts, &[session.clone()]),
            "Previously discussed: Rust. 1 related insights found. 1 related conversations."
        );
        assert_eq!(
            generate_context_summary(&[entity], &[], &[]),
            "Previously discussed: Rust."
        );
        // Similar sessions alone are not context
        assert_eq!(generate_context_summary(&[], &[], &[session]), NO_CONTEXT_SUMMARY);
    }
}
