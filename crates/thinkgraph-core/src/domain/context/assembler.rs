//! Graph-backed conversation context assembly
//!
//! For each turn the assembler extracts mentions from the user input, runs
//! three bounded graph reads, ranks the thought candidates and summarizes the
//! result. Graph failures never reach the caller: they degrade to an empty
//! context with a diagnostic summary.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::extraction::EntityExtractor;
use crate::domain::graph::{
    EntityContextRecord, GraphStore, SessionThoughtRecord, SimilarSessionRecord, ThoughtRecord,
};
use crate::error::{Error, Result};

use super::mentions::MentionExtractor;
use super::prompt;
use super::ranking::{calculate_thought_relevance, generate_context_summary, rank_thoughts, truncate_for_display};
use super::types::{
    ContextMetadata, ConversationContext, GRAPH_FAILURE_SUMMARY, GRAPH_TIMEOUT_SUMMARY,
    RelatedEntity, RelatedThought, SimilarSession, ThoughtSource, get_context_metadata,
};

/// Related entity names kept per entity
const RELATED_CONCEPTS_PER_ENTITY: usize = 3;

/// Configuration for context assembly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Recent thoughts of the current session to consider
    pub context_window: usize,
    /// Maximum mentions extracted, and entities returned
    pub max_context_entities: usize,
    /// Thoughts kept after ranking
    pub max_related_thoughts: usize,
    pub max_similar_sessions: usize,
    pub sample_thoughts_per_session: usize,
    /// Thoughts per entity that become ranking candidates
    pub thoughts_per_entity: usize,
    /// Thoughts fetched per entity
    pub related_thoughts_per_entity: usize,
    /// Neighbouring entities fetched per entity
    pub related_entities_per_entity: usize,
    /// Candidates whose trimmed content is not longer than this are skipped
    pub min_thought_chars: usize,
    /// Thought content longer than this is truncated for display
    pub display_chars: usize,
    /// Upper bound for the three graph reads together
    pub query_timeout_ms: u64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            context_window: 5,
            max_context_entities: 10,
            max_related_thoughts: 5,
            max_similar_sessions: 3,
            sample_thoughts_per_session: 2,
            thoughts_per_entity: 2,
            related_thoughts_per_entity: 5,
            related_entities_per_entity: 5,
            min_thought_chars: 10,
            display_chars: 200,
            query_timeout_ms: 3000,
        }
    }
}

impl ContextConfig {
    /// Create a minimal config for quick turns
    pub fn minimal() -> Self {
        Self {
            context_window: 3,
            max_context_entities: 5,
            max_related_thoughts: 3,
            max_similar_sessions: 1,
            thoughts_per_entity: 1,
            related_thoughts_per_entity: 3,
            related_entities_per_entity: 3,
            query_timeout_ms: 1000,
            ..Default::default()
        }
    }

    /// Create a rich config for comprehensive context
    pub fn comprehensive() -> Self {
        Self {
            context_window: 10,
            max_context_entities: 15,
            max_related_thoughts: 10,
            max_similar_sessions: 5,
            sample_thoughts_per_session: 3,
            thoughts_per_entity: 3,
            related_thoughts_per_entity: 10,
            related_entities_per_entity: 10,
            display_chars: 400,
            query_timeout_ms: 5000,
            ..Default::default()
        }
    }
}

/// Raw results of the three graph reads
struct GraphReads {
    entities: Vec<EntityContextRecord>,
    session: Vec<SessionThoughtRecord>,
    similar: Vec<SimilarSessionRecord>,
}

/// Assembles conversation context from the knowledge graph
pub struct ContextAssembler<S: GraphStore> {
    store: Arc<S>,
    extractor: Arc<EntityExtractor>,
    mentions: MentionExtractor,
    config: ContextConfig,
}

impl<S: GraphStore> ContextAssembler<S> {
    /// Create a new assembler with default configuration
    pub fn new(store: Arc<S>, extractor: Arc<EntityExtractor>) -> Result<Self> {
        Self::with_config(store, extractor, ContextConfig::default())
    }

    /// Create a new assembler with custom configuration
    pub fn with_config(
        store: Arc<S>,
        extractor: Arc<EntityExtractor>,
        config: ContextConfig,
    ) -> Result<Self> {
        Ok(Self {
            store,
            extractor,
            mentions: MentionExtractor::new()?,
            config,
        })
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn extractor(&self) -> &EntityExtractor {
        &self.extractor
    }

    /// Mentions the assembler would look up for `user_input`
    pub fn extract_mentions(&self, user_input: &str) -> Vec<String> {
        self.mentions
            .extract(&self.extractor, user_input, self.config.max_context_entities)
    }

    /// Context for one conversational turn. Never fails: graph errors and
    /// timeouts yield an empty context with a diagnostic summary.
    pub async fn get_conversation_context(
        &self,
        user_input: &str,
        session_id: &str,
    ) -> ConversationContext {
        let mentions = self.extract_mentions(user_input);
        if mentions.is_empty() {
            debug!("No mentions in input, skipping graph reads");
            return ConversationContext::empty();
        }
        debug!(mentions = ?mentions, session_id, "Assembling conversation context");

        let limit = Duration::from_millis(self.config.query_timeout_ms);
        match tokio::time::timeout(limit, self.read_graph(&mentions, session_id)).await {
            Ok(Ok(reads)) => self.assemble(reads, mentions),
            Ok(Err(e)) => {
                warn!(error = %e, "Knowledge graph query failed, continuing without context");
                ConversationContext::unavailable(mentions, GRAPH_FAILURE_SUMMARY)
            }
            Err(_) => {
                let timeout = Error::Timeout(self.config.query_timeout_ms);
                warn!(error = %timeout, "Knowledge graph query timed out, continuing without context");
                ConversationContext::unavailable(mentions, GRAPH_TIMEOUT_SUMMARY)
            }
        }
    }

    /// See [`prompt::build_enhanced_prompt`]
    pub fn build_enhanced_prompt(&self, user_input: &str, context: &ConversationContext) -> String {
        prompt::build_enhanced_prompt(user_input, context)
    }

    /// See [`get_context_metadata`]
    pub fn get_context_metadata(&self, context: &ConversationContext) -> ContextMetadata {
        get_context_metadata(context)
    }

    async fn read_graph(&self, mentions: &[String], session_id: &str) -> Result<GraphReads> {
        let config = &self.config;
        let (entities, session, similar) = tokio::try_join!(
            self.store.entity_context(
                mentions,
                config.related_thoughts_per_entity,
                config.related_entities_per_entity,
                config.max_context_entities,
            ),
            self.store.session_thoughts(session_id, config.context_window),
            self.store.similar_sessions(
                mentions,
                session_id,
                config.max_similar_sessions,
                config.sample_thoughts_per_session,
            ),
        )?;
        Ok(GraphReads {
            entities,
            session,
            similar,
        })
    }

    fn assemble(&self, reads: GraphReads, mentions: Vec<String>) -> ConversationContext {
        let config = &self.config;
        let mut candidates = Vec::new();
        let mut related_entities = Vec::with_capacity(reads.entities.len());

        for record in reads.entities.into_iter().take(config.max_context_entities) {
            for thought in record.related_thoughts.iter().take(config.thoughts_per_entity) {
                if let Some(candidate) = self.candidate(
                    thought,
                    &mentions,
                    ThoughtSource::Entity,
                    vec![record.name.clone()],
                ) {
                    candidates.push(candidate);
                }
            }

            related_entities.push(RelatedEntity {
                related_concepts: record
                    .related_entities
                    .iter()
                    .take(RELATED_CONCEPTS_PER_ENTITY)
                    .map(|e| e.name.clone())
                    .collect(),
                name: record.name,
                entity_types: record.labels,
                definition: record.definition,
                mention_count: record.thought_count,
            });
        }

        for record in reads.session {
            if let Some(candidate) = self.candidate(
                &record.thought,
                &mentions,
                ThoughtSource::Session,
                record.entities,
            ) {
                candidates.push(candidate);
            }
        }

        let related_thoughts = rank_thoughts(candidates, config.max_related_thoughts);

        let similar_sessions: Vec<SimilarSession> = reads
            .similar
            .into_iter()
            .take(config.max_similar_sessions)
            .map(|s| SimilarSession {
                session_id: s.session_id,
                strategy: s.reasoning_strategy,
                domain: s.domain,
                entity_overlap: s.shared_entities,
                sample_thoughts: s
                    .sample_thoughts
                    .iter()
                    .map(|t| truncate_for_display(t, config.display_chars))
                    .collect(),
            })
            .collect();

        let context_summary =
            generate_context_summary(&related_entities, &related_thoughts, &similar_sessions);

        debug!(
            entities = related_entities.len(),
            thoughts = related_thoughts.len(),
            sessions = similar_sessions.len(),
            "Conversation context assembled"
        );

        ConversationContext {
            related_entities,
            related_thoughts,
            similar_sessions,
            context_summary,
            extracted_entities: mentions,
        }
    }

    fn candidate(
        &self,
        thought: &ThoughtRecord,
        mentions: &[String],
        source: ThoughtSource,
        mentioned_entities: Vec<String>,
    ) -> Option<RelatedThought> {
        let content = thought.content.as_str();
        if content.trim().chars().count() <= self.config.min_thought_chars {
            return None;
        }
        Some(RelatedThought {
            relevance_score: calculate_thought_relevance(content, mentions),
            content: truncate_for_display(content, self.config.display_chars),
            thought_type: thought.thought_type,
            confidence: thought.confidence,
            timestamp: thought.timestamp,
            session_id: thought.session_id.clone(),
            source,
            mentioned_entities,
        })
    }
}
