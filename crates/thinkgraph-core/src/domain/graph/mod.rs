//! Knowledge graph domain
//!
//! The graph itself lives behind [`GraphStore`] / [`GraphWriter`]; this module
//! only defines the node/edge model and the record shapes reads return.

pub mod model;
pub mod store;

pub use model::{
    EntityContextRecord, EntityLink, EntityNode, FlowType, GraphStats, NodeConnection, NodeDetail,
    NodeStatistics, NodeTimelineEntry, PatternAnalysis, ReasoningEdge, ReasoningPattern,
    RelatedEntityRecord, SearchHit, SearchHitKind, SearchKind, SessionDetail, SessionGraph,
    SessionSummary, SessionThoughtRecord, SimilarSessionRecord, SuccessfulPattern, ThinkingSession,
    Thought, ThoughtLinks, ThoughtRecord, ThoughtType, ToolUsagePattern,
};
pub use store::{GraphStore, GraphWriter};
