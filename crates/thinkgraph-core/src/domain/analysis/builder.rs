//! Knowledge graph building from thinking sessions

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::info;

use crate::domain::extraction::{EntityExtractor, ExtractionResult};
use crate::domain::graph::{
    EntityNode, GraphWriter, PatternAnalysis, ReasoningEdge, SessionGraph, ThinkingSession, Thought,
};
use crate::error::{Error, Result};

use super::analyzer::{AnalyzedThinking, ThinkingAnalyzer};

/// Relationship recorded between entities mentioned by the same thought
pub const CO_MENTION_RELATIONSHIP: &str = "RELATED_TO";

/// Rows returned per pattern query
const PATTERN_LIMIT: usize = 20;

/// Generated session id for `now`
pub fn generate_session_id() -> String {
    Utc::now().format("session_%Y%m%d_%H%M%S").to_string()
}

/// Persists analyzed thinking into the graph
pub struct KnowledgeGraphBuilder<W: GraphWriter> {
    store: Arc<W>,
    analyzer: ThinkingAnalyzer,
    extractor: Arc<EntityExtractor>,
}

impl<W: GraphWriter> KnowledgeGraphBuilder<W> {
    pub fn new(store: Arc<W>, analyzer: ThinkingAnalyzer, extractor: Arc<EntityExtractor>) -> Self {
        Self {
            store,
            analyzer,
            extractor,
        }
    }

    pub fn store(&self) -> &Arc<W> {
        &self.store
    }

    pub fn analyzer(&self) -> &ThinkingAnalyzer {
        &self.analyzer
    }

    /// Analyze and persist `text`, returning the session id
    pub async fn process_thinking(
        &self,
        text: &str,
        session_id: Option<&str>,
        overwrite: bool,
    ) -> Result<String> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("thinking text must not be empty".to_string()));
        }

        let session_id = match session_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => generate_session_id(),
        };

        let analyzed = self.analyzer.analyze(text).await;
        self.add_thinking_session(&session_id, text, &analyzed, overwrite)
            .await
    }

    /// Persist an analysis as a session.
    ///
    /// An existing session is kept as is unless `overwrite` is set, in which
    /// case it is replaced with all its thoughts and edges. The session is
    /// written in one transaction: a failed write stores nothing and leaves
    /// any previous version in place.
    pub async fn add_thinking_session(
        &self,
        session_id: &str,
        text: &str,
        analyzed: &AnalyzedThinking,
        overwrite: bool,
    ) -> Result<String> {
        if !overwrite && self.store.session_exists(session_id).await? {
            info!(session_id = %session_id, "Session already exists, keeping stored version");
            return Ok(session_id.to_string());
        }

        let extraction = self.extractor.extract_entities_with_confidence(text);
        let graph = self.session_graph(session_id, text, analyzed, &extraction);
        let thoughts = graph.thoughts.len();
        let flows = graph.edges.len();

        if !self.store.write_session(&graph, overwrite).await? {
            info!(session_id = %session_id, "Session already exists, keeping stored version");
            return Ok(session_id.to_string());
        }

        info!(
            session_id = %session_id,
            thoughts,
            flows,
            entity_count = extraction.total_entities,
            definitions = extraction.definitions.len(),
            "Thinking session ingested"
        );
        Ok(session_id.to_string())
    }

    fn session_graph(
        &self,
        session_id: &str,
        text: &str,
        analyzed: &AnalyzedThinking,
        extraction: &ExtractionResult,
    ) -> SessionGraph {
        let created_at = Utc::now();
        let mut graph = SessionGraph::new(ThinkingSession {
            id: session_id.to_string(),
            raw_text: text.to_string(),
            reasoning_strategy: analyzed.reasoning_strategy.clone(),
            domain: analyzed.domain.clone(),
            success_indicators: analyzed.success_indicators.clone(),
            created_at,
        });

        let mut thought_ids = Vec::with_capacity(analyzed.thoughts.len());
        for (index, analyzed_thought) in analyzed.thoughts.iter().enumerate() {
            let thought = Thought {
                id: Thought::id_for(session_id, index),
                session_id: session_id.to_string(),
                content: analyzed_thought.content.clone(),
                thought_type: analyzed_thought.thought_type,
                confidence: analyzed_thought.confidence.clamp(0.0, 1.0),
                sequence_order: index as u32,
                // Distinct timestamps keep recency order equal to reasoning order
                created_at: created_at + Duration::microseconds(index as i64),
            };
            thought_ids.push(thought.id.clone());

            let entities = distinct(&analyzed_thought.entities);
            for (i, first) in entities.iter().enumerate() {
                for second in &entities[i + 1..] {
                    graph = graph.with_link(first, second, CO_MENTION_RELATIONSHIP);
                }
            }
            graph = graph.with_thought(thought, entities, distinct(&analyzed_thought.tools));
        }

        for relationship in &analyzed.relationships {
            let (Some(source), Some(target)) = (
                thought_ids.get(relationship.source),
                thought_ids.get(relationship.target),
            ) else {
                continue;
            };
            graph = graph.with_edge(ReasoningEdge {
                source_id: source.clone(),
                target_id: target.clone(),
                flow_type: relationship.flow_type,
                strength: relationship.strength.clamp(0.0, 1.0),
            });
        }

        for (category, entities) in &extraction.entities {
            for entity in entities {
                graph = graph.with_entity(EntityNode::typed(&entity.name, category.node_label()));
            }
        }
        for (term, definition) in &extraction.definitions {
            graph = graph.with_entity(EntityNode::untyped(term).with_definition(&definition.definition));
        }
        graph
    }

    /// Reasoning, success and tool usage patterns across all sessions
    pub async fn analyze_patterns(&self) -> Result<PatternAnalysis> {
        Ok(PatternAnalysis {
            reasoning_patterns: self.store.reasoning_patterns(PATTERN_LIMIT).await?,
            successful_patterns: self.store.successful_patterns(PATTERN_LIMIT).await?,
            tool_usage_patterns: self.store.tool_usage_patterns(PATTERN_LIMIT).await?,
        })
    }
}

/// Trimmed non-empty names, first casing kept
fn distinct(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty() && seen.insert(n.to_lowercase()))
        .map(str::to_string)
        .collect()
}
