//! Knowledge graph model
//!
//! Node kinds: sessions, thoughts, entities and tools. Edge kinds: a session
//! contains thoughts, a thought mentions entities and uses tools, thoughts are
//! linked by reasoning flows, and co-mentioned entities are related.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of reasoning step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ThoughtType {
    Observation,
    Analysis,
    Decision,
    Action,
    #[default]
    Reflection,
}

impl ThoughtType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Observation => "observation",
            Self::Analysis => "analysis",
            Self::Decision => "decision",
            Self::Action => "action",
            Self::Reflection => "reflection",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "observation" => Some(Self::Observation),
            "analysis" => Some(Self::Analysis),
            "decision" => Some(Self::Decision),
            "action" => Some(Self::Action),
            "reflection" => Some(Self::Reflection),
            _ => None,
        }
    }

    /// Parse, mapping unknown values to `Reflection`
    pub fn parse_lossy(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }
}

impl fmt::Display for ThoughtType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of link between two thoughts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FlowType {
    #[default]
    LeadsTo,
    DependsOn,
    Supports,
    Contradicts,
}

impl FlowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LeadsTo => "leads_to",
            Self::DependsOn => "depends_on",
            Self::Supports => "supports",
            Self::Contradicts => "contradicts",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "leads_to" => Some(Self::LeadsTo),
            "depends_on" => Some(Self::DependsOn),
            "supports" => Some(Self::Supports),
            "contradicts" => Some(Self::Contradicts),
            _ => None,
        }
    }
}

impl fmt::Display for FlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A thinking episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinkingSession {
    pub id: String,
    pub raw_text: String,
    pub reasoning_strategy: String,
    pub domain: String,
    pub success_indicators: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// One reasoning step within a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thought {
    pub id: String,
    pub session_id: String,
    pub content: String,
    pub thought_type: ThoughtType,
    pub confidence: f32,
    pub sequence_order: u32,
    pub created_at: DateTime<Utc>,
}

impl Thought {
    /// Stable thought id derived from its session and position
    pub fn id_for(session_id: &str, index: usize) -> String {
        format!("{session_id}_thought_{index}")
    }
}

/// Directed reasoning flow between two thoughts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningEdge {
    pub source_id: String,
    pub target_id: String,
    pub flow_type: FlowType,
    pub strength: f32,
}

/// Entity node written by the graph builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityNode {
    pub name: String,
    /// Category label such as `Person` or `Tool`; `Entity` when untyped
    pub entity_type: String,
    pub definition: Option<String>,
}

impl EntityNode {
    pub const UNTYPED: &'static str = "Entity";

    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: Self::UNTYPED.to_string(),
            definition: None,
        }
    }

    pub fn typed(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            definition: None,
        }
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }
}

// ========== Session writes ==========

/// A thought with the entities it mentions and the tools it uses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtLinks {
    pub thought: Thought,
    pub entities: Vec<String>,
    pub tools: Vec<String>,
}

/// Undirected relationship between two entities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityLink {
    pub source: String,
    pub target: String,
    pub relationship: String,
}

/// Everything one ingest writes. Stores persist it all or not at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionGraph {
    pub session: ThinkingSession,
    pub thoughts: Vec<ThoughtLinks>,
    /// Reasoning flows between thoughts of this graph
    pub edges: Vec<ReasoningEdge>,
    pub entity_links: Vec<EntityLink>,
    /// Typed entities and definitions extracted from the raw text
    pub entities: Vec<EntityNode>,
}

impl SessionGraph {
    pub fn new(session: ThinkingSession) -> Self {
        Self {
            session,
            thoughts: Vec::new(),
            edges: Vec::new(),
            entity_links: Vec::new(),
            entities: Vec::new(),
        }
    }

    pub fn with_thought(mut self, thought: Thought, entities: Vec<String>, tools: Vec<String>) -> Self {
        self.thoughts.push(ThoughtLinks {
            thought,
            entities,
            tools,
        });
        self
    }

    pub fn with_edge(mut self, edge: ReasoningEdge) -> Self {
        self.edges.push(edge);
        self
    }

    pub fn with_link(
        mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        relationship: impl Into<String>,
    ) -> Self {
        self.entity_links.push(EntityLink {
            source: source.into(),
            target: target.into(),
            relationship: relationship.into(),
        });
        self
    }

    pub fn with_entity(mut self, entity: EntityNode) -> Self {
        self.entities.push(entity);
        self
    }
}

// ========== Read records ==========

/// A thought as returned by graph reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtRecord {
    pub id: String,
    pub content: String,
    pub thought_type: ThoughtType,
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
}

/// An entity adjacent to another through a relationship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedEntityRecord {
    pub name: String,
    pub entity_type: String,
    pub relationship: String,
}

/// A stored entity with its neighbourhood
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityContextRecord {
    pub name: String,
    pub labels: Vec<String>,
    pub definition: Option<String>,
    /// Total thoughts mentioning the entity, before the per-entity limit
    pub thought_count: u32,
    pub related_thoughts: Vec<ThoughtRecord>,
    pub related_entities: Vec<RelatedEntityRecord>,
}

/// A thought of the current session with the entities it mentions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionThoughtRecord {
    pub thought: ThoughtRecord,
    pub entities: Vec<String>,
}

/// Another session sharing entities with the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarSessionRecord {
    pub session_id: String,
    pub reasoning_strategy: String,
    pub domain: String,
    pub shared_entities: u32,
    pub sample_thoughts: Vec<String>,
    pub created_at: DateTime<Utc>,
}

// ========== Search and node details ==========

/// Which node kinds a search covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    #[default]
    All,
    Entities,
    Thoughts,
}

impl SearchKind {
    pub fn includes_entities(self) -> bool {
        matches!(self, Self::All | Self::Entities)
    }

    pub fn includes_thoughts(self) -> bool {
        matches!(self, Self::All | Self::Thoughts)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchHitKind {
    Entity,
    Thought,
}

/// A search match with the text around it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub kind: SearchHitKind,
    /// Entity name or thought id
    pub id: String,
    /// Entity type or thought type
    pub label: String,
    pub snippet: String,
    /// Owning session of a thought hit
    pub session_id: Option<String>,
}

/// Aggregates over an entity's edges and mentions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NodeStatistics {
    pub connection_count: u32,
    pub mention_count: u32,
    pub session_count: u32,
    /// Mean confidence of the mentioning thoughts, 0 when unmentioned
    pub average_confidence: f64,
    pub relationship_types: BTreeMap<String, u32>,
}

/// A stored entity with its statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDetail {
    pub name: String,
    pub entity_type: String,
    pub definition: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub statistics: NodeStatistics,
}

/// An entity related to the inspected one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConnection {
    pub name: String,
    pub entity_type: String,
    pub relationship: String,
    pub strength: f64,
}

/// A session that mentions the inspected entity, with the mentioning thoughts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTimelineEntry {
    pub session_id: String,
    pub reasoning_strategy: String,
    pub domain: String,
    pub created_at: DateTime<Utc>,
    pub thoughts: Vec<ThoughtRecord>,
}

// ========== Analytics ==========

/// Session listing entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub reasoning_strategy: String,
    pub domain: String,
    pub thought_count: u32,
    pub created_at: DateTime<Utc>,
}

/// A session with its ordered thoughts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDetail {
    pub session: ThinkingSession,
    pub thoughts: Vec<Thought>,
}

/// How often a strategy/domain combination occurs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningPattern {
    pub strategy: String,
    pub domain: String,
    pub frequency: u32,
}

/// Thought-type sequence of sessions that reported success indicators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessfulPattern {
    pub strategy: String,
    pub thought_sequence: Vec<ThoughtType>,
    pub indicators: Vec<String>,
    pub frequency: u32,
}

/// Which thought types use a tool, and how often
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUsagePattern {
    pub tool_name: String,
    pub thought_types: Vec<ThoughtType>,
    pub usage_count: u32,
}

/// Combined pattern analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PatternAnalysis {
    pub reasoning_patterns: Vec<ReasoningPattern>,
    pub successful_patterns: Vec<SuccessfulPattern>,
    pub tool_usage_patterns: Vec<ToolUsagePattern>,
}

/// Node and edge counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GraphStats {
    pub sessions: u64,
    pub thoughts: u64,
    pub entities: u64,
    pub tools: u64,
    pub mentions: u64,
    pub reasoning_flows: u64,
    pub entity_relationships: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thought_type_parse() {
        assert_eq!(ThoughtType::parse("Decision"), Some(ThoughtType::Decision));
        assert_eq!(ThoughtType::parse("nonsense"), None);
        assert_eq!(ThoughtType::parse_lossy("nonsense"), ThoughtType::Reflection);
    }

    #[test]
    fn test_flow_type_roundtrip() {
        for flow in [
            FlowType::LeadsTo,
            FlowType::DependsOn,
            FlowType::Supports,
            FlowType::Contradicts,
        ] {
            assert_eq!(FlowType::parse(flow.as_str()), Some(flow));
        }
    }

    #[test]
    fn test_search_kind_coverage() {
        assert!(SearchKind::All.includes_entities() && SearchKind::All.includes_thoughts());
        assert!(!SearchKind::Entities.includes_thoughts());
        assert!(!SearchKind::Thoughts.includes_entities());
    }

    #[test]
    fn test_thought_id() {
        assert_eq!(Thought::id_for("session_1", 3), "session_1_thought_3");
    }
}
