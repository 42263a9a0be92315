//! Conversation context records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::graph::ThoughtType;

/// Summary used when nothing relevant is known
pub const NO_CONTEXT_SUMMARY: &str = "No relevant context found from previous conversations.";

/// Summary used when the graph could not be queried
pub const GRAPH_FAILURE_SUMMARY: &str = "Context unavailable: knowledge graph query failed.";

/// Summary used when the graph did not answer in time
pub const GRAPH_TIMEOUT_SUMMARY: &str = "Context unavailable: knowledge graph query timed out.";

/// A stored entity mentioned by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedEntity {
    pub name: String,
    pub entity_types: Vec<String>,
    pub definition: Option<String>,
    /// Thoughts in the graph that mention this entity
    pub mention_count: u32,
    pub related_concepts: Vec<String>,
}

/// Where a related thought came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThoughtSource {
    /// Found through a mentioned entity
    Entity,
    /// Recent thought of the current session
    Session,
}

/// A ranked thought candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedThought {
    /// Display content, truncated with an ellipsis
    pub content: String,
    pub thought_type: ThoughtType,
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub relevance_score: f32,
    pub source: ThoughtSource,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentioned_entities: Vec<String>,
}

/// Another session that touched the same entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarSession {
    pub session_id: String,
    pub strategy: String,
    pub domain: String,
    pub entity_overlap: u32,
    pub sample_thoughts: Vec<String>,
}

/// Graph context assembled for one conversational turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub related_entities: Vec<RelatedEntity>,
    pub related_thoughts: Vec<RelatedThought>,
    pub similar_sessions: Vec<SimilarSession>,
    pub context_summary: String,
    pub extracted_entities: Vec<String>,
}

impl ConversationContext {
    /// The canonical empty context
    pub fn empty() -> Self {
        Self {
            related_entities: Vec::new(),
            related_thoughts: Vec::new(),
            similar_sessions: Vec::new(),
            context_summary: NO_CONTEXT_SUMMARY.to_string(),
            extracted_entities: Vec::new(),
        }
    }

    /// Empty context carrying the mentions that were extracted and a diagnostic summary
    pub fn unavailable(extracted_entities: Vec<String>, summary: &str) -> Self {
        Self {
            context_summary: summary.to_string(),
            extracted_entities,
            ..Self::empty()
        }
    }

    pub fn has_context(&self) -> bool {
        !self.related_entities.is_empty() || !self.related_thoughts.is_empty()
    }
}

/// Counts describing a context, for observability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextMetadata {
    pub context_entities_count: usize,
    pub context_thoughts_count: usize,
    pub similar_sessions_count: usize,
    pub extracted_entities: Vec<String>,
    pub context_summary: String,
    pub used_context: bool,
}

/// Project a context onto its metadata
pub fn get_context_metadata(context: &ConversationContext) -> ContextMetadata {
    ContextMetadata {
        context_entities_count: context.related_entities.len(),
        context_thoughts_count: context.related_thoughts.len(),
        similar_sessions_count: context.similar_sessions.len(),
        extracted_entities: context.extracted_entities.clone(),
        context_summary: context.context_summary.clone(),
        used_context: context.has_context(),
    }
}
