//! Graph store traits
//!
//! [`GraphStore`] is the read side the context assembler depends on. Every
//! method takes an explicit limit and implementations must bound their reads
//! by it. [`GraphWriter`] adds the writes and analytics used when building the
//! graph from thinking sessions.

use async_trait::async_trait;

use crate::error::Result;

use super::model::{
    EntityContextRecord, GraphStats, NodeConnection, NodeDetail, NodeTimelineEntry,
    ReasoningPattern, SearchHit, SearchKind, SessionDetail, SessionGraph, SessionSummary,
    SessionThoughtRecord, SimilarSessionRecord, SuccessfulPattern, ToolUsagePattern,
};

/// Read access to the knowledge graph
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Stored entities matching `names` case-insensitively, with their definitions
    /// and neighbourhoods, ordered by related-thought count descending
    async fn entity_context(
        &self,
        names: &[String],
        thoughts_per_entity: usize,
        related_per_entity: usize,
        limit: usize,
    ) -> Result<Vec<EntityContextRecord>>;

    /// Most recent thoughts of a session, newest first
    async fn session_thoughts(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<SessionThoughtRecord>>;

    /// Other sessions mentioning any of `names`, ranked by overlap descending
    async fn similar_sessions(
        &self,
        names: &[String],
        exclude_session_id: &str,
        limit: usize,
        sample_size: usize,
    ) -> Result<Vec<SimilarSessionRecord>>;
}

/// Write and analytics access to the knowledge graph
#[async_trait]
pub trait GraphWriter: GraphStore {
    // ========== Session Operations ==========

    async fn session_exists(&self, session_id: &str) -> Result<bool>;

    /// Store a session with its thoughts, edges and entities in one
    /// transaction. An existing session with the same id is replaced when
    /// `overwrite` is set and left untouched otherwise. Returns whether the
    /// graph was written; on error nothing from `graph` is stored and any
    /// session it would have replaced survives.
    async fn write_session(&self, graph: &SessionGraph, overwrite: bool) -> Result<bool>;

    /// Delete a session, its thoughts, and every edge touching those thoughts
    async fn delete_session(&self, session_id: &str) -> Result<bool>;

    async fn list_sessions(&self, limit: usize) -> Result<Vec<SessionSummary>>;

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionDetail>>;

    // ========== Search and Node Details ==========

    /// Case-insensitive substring search over entity names and definitions
    /// and thought content. Entity hits come first.
    async fn search(&self, query: &str, kind: SearchKind, limit: usize) -> Result<Vec<SearchHit>>;

    /// An entity by case-insensitive name, with its statistics
    async fn node_detail(&self, name: &str) -> Result<Option<NodeDetail>>;

    /// Entities related to `name`, strongest first
    async fn node_connections(&self, name: &str, limit: usize) -> Result<Vec<NodeConnection>>;

    /// Sessions mentioning `name`, newest first
    async fn node_timeline(&self, name: &str, limit: usize) -> Result<Vec<NodeTimelineEntry>>;

    // ========== Analytics ==========

    async fn reasoning_patterns(&self, limit: usize) -> Result<Vec<ReasoningPattern>>;

    async fn successful_patterns(&self, limit: usize) -> Result<Vec<SuccessfulPattern>>;

    async fn tool_usage_patterns(&self, limit: usize) -> Result<Vec<ToolUsagePattern>>;

    async fn stats(&self) -> Result<GraphStats>;

    /// Remove every node and edge
    async fn clear(&self) -> Result<()>;
}
