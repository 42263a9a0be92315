//! Context-enhanced system prompts

use super::ranking::truncate_for_display;
use super::types::ConversationContext;

const BASE_PROMPT: &str = "You are a knowledgeable AI assistant with access to conversation history and related concepts from previous discussions.";

const RESPONSE_GUIDELINES: &str = "\n\nWhen responding:
1. Reference relevant previous discussions when helpful
2. Build upon established knowledge and definitions
3. Point out interesting connections between topics
4. Avoid repeating information unnecessarily
5. Use the context to provide more insightful and personalized responses";

const PROMPT_ENTITIES: usize = 3;
const PROMPT_THOUGHTS: usize = 3;
const PROMPT_RELATED_CONCEPTS: usize = 2;
const PROMPT_DEFINITION_CHARS: usize = 100;

/// Coarse tag for a thought's confidence
pub fn confidence_tier(confidence: f32) -> &'static str {
    if confidence < 0.5 {
        "low"
    } else if confidence < 0.8 {
        "medium"
    } else {
        "high"
    }
}

/// System prompt embedding the context, ending with the user's question.
///
/// Deterministic for a given input and context.
pub fn build_enhanced_prompt(user_input: &str, context: &ConversationContext) -> String {
    let mut prompt = String::from(BASE_PROMPT);

    if !context.context_summary.is_empty() {
        prompt.push_str("\n\nContext: ");
        prompt.push_str(&context.context_summary);
    }

    if !context.related_entities.is_empty() {
        prompt.push_str("\n\nRelevant concepts from our knowledge base:");
        for entity in context.related_entities.iter().take(PROMPT_ENTITIES) {
            prompt.push_str("\n- ");
            prompt.push_str(&entity.name);
            if let Some(definition) = entity.definition.as_deref().filter(|d| !d.is_empty()) {
                prompt.push_str(": ");
                prompt.push_str(&truncate_for_display(definition, PROMPT_DEFINITION_CHARS));
            }
            if !entity.related_concepts.is_empty() {
                let related: Vec<&str> = entity
                    .related_concepts
                    .iter()
                    .take(PROMPT_RELATED_CONCEPTS)
                    .map(String::as_str)
                    .collect();
                prompt.push_str(&format!(" (Related: {})", related.join(", ")));
            }
        }
    }

    if !context.related_thoughts.is_empty() {
        prompt.push_str("\n\nRelevant insights from previous conversations:");
        for thought in context.related_thoughts.iter().take(PROMPT_THOUGHTS) {
            prompt.push_str(&format!(
                "\n- [{}] {}",
                confidence_tier(thought.confidence),
                thought.content
            ));
        }
    }

    if !context.similar_sessions.is_empty() {
        prompt.push_str("\n\nRelated conversation topics:");
        for session in &context.similar_sessions {
            let strategy = non_empty_or(&session.strategy, "General discussion");
            let domain = non_empty_or(&session.domain, "various topics");
            prompt.push_str(&format!("\n- {} about {}", strategy, domain));
        }
    }

    prompt.push_str(RESPONSE_GUIDELINES);
    prompt.push_str("\n\nCurrent question: ");
    prompt.push_str(user_input);
    prompt
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() { fallback } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::context::types::{RelatedEntity, RelatedThought, SimilarSession, ThoughtSource};
    use crate::domain::graph::ThoughtType;
    use chrono::Utc;

    fn entity(name: &str, definition: Option<&str>, related: &[&str]) -> RelatedEntity {
        RelatedEntity {
            name: name.to_string(),
            entity_types: vec!["Entity".into()],
            definition: definition.map(str::to_string),
            mention_count: 1,
            related_concepts: related.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn thought(content: &str, confidence: f32) -> RelatedThought {
        RelatedThought {
            content: content.to_string(),
            thought_type: ThoughtType::Observation,
            confidence,
            timestamp: Utc::now(),
            session_id: "s1".into(),
            relevance_score: 1.0,
            source: ThoughtSource::Entity,
            mentioned_entities: Vec::new(),
        }
    }

    #[test]
    fn test_empty_context_prompt() {
        let prompt = build_enhanced_prompt("What is Rust?", &ConversationContext::empty());
        assert!(prompt.starts_with(BASE_PROMPT));
        assert!(prompt.contains("Context: No relevant context found"));
        assert!(!prompt.contains("Relevant concepts"));
        assert!(!prompt.contains("Relevant insights"));
        assert!(!prompt.contains("Related conversation topics"));
        assert!(prompt.contains("When responding:"));
        assert!(prompt.ends_with("\n\nCurrent question: What is Rust?"));
    }

    #[test]
    fn test_prompt_sections_and_limits() {
        let mut context = ConversationContext::empty();
        context.context_summary = "Previously discussed: Rust.".into();
        context.related_entities = vec![
            entity("Rust", Some("a systems language"), &["Cargo", "Tokio", "Serde"]),
            entity("Cargo", None, &[]),
            entity("Tokio", None, &[]),
            entity("Serde", None, &[]),
        ];
        context.related_thoughts = vec![
            thought("low confidence idea", 0.3),
            thought("medium confidence idea", 0.6),
            thought("high confidence idea", 0.9),
            thought("fourth idea", 0.9),
        ];
        context.similar_sessions = vec![SimilarSession {
            session_id: "s2".into(),
            strategy: "sequential".into(),
            domain: String::new(),
            entity_overlap: 1,
            sample_thoughts: Vec::new(),
        }];

        let prompt = build_enhanced_prompt("Tell me more", &context);
        assert!(prompt.contains("\n- Rust: a systems language (Related: Cargo, Tokio)"));
        assert!(prompt.contains("\n- Tokio"));
        assert!(!prompt.contains("\n- Serde"));
        assert!(prompt.contains("\n- [low] low confidence idea"));
        assert!(prompt.contains("\n- [medium] medium confidence idea"));
        assert!(prompt.contains("\n- [high] high confidence idea"));
        assert!(!prompt.contains("fourth idea"));
        assert!(prompt.contains("\n- sequential about various topics"));
    }

    #[test]
    fn test_long_definition_truncated() {
        let mut context = ConversationContext::empty();
        let definition = "x".repeat(150);
        context.related_entities = vec![entity("Rust", Some(&definition), &[])];

        let prompt = build_enhanced_prompt("q", &context);
        assert!(prompt.contains(&format!("- Rust: {}...", "x".repeat(100))));
        assert!(!prompt.contains(&"x".repeat(101)));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let mut context = ConversationContext::empty();
        context.related_entities = vec![entity("Rust", None, &["Cargo"])];
        assert_eq!(build_enhanced_prompt("q", &context), build_enhanced_prompt("q", &context));
    }
}
