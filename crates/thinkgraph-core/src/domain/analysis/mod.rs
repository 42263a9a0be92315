//! Thinking analysis and graph building
//!
//! - `analyzer`: text → [`AnalyzedThinking`], model-backed with a regex fallback
//! - `builder`: [`KnowledgeGraphBuilder`] persisting analyses through a [`crate::domain::graph::GraphWriter`]

pub mod analyzer;
pub mod builder;

pub use analyzer::{
    AnalyzedRelationship, AnalyzedThinking, AnalyzedThought, ThinkingAnalyzer,
    extract_json_from_response, parse_model_analysis,
};
pub use builder::{CO_MENTION_RELATIONSHIP, KnowledgeGraphBuilder, generate_session_id};
