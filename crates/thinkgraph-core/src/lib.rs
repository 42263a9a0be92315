//! Thinkgraph Core Library
//!
//! This crate provides the core functionality for Thinkgraph, including:
//! - Entity and definition extraction with confidence scoring
//! - Graph-backed conversation context assembly
//! - Thinking analysis and knowledge graph building
//! - Storage (SQLite-backed property graph)
//! - LLM integration (OpenAI-compatible chat completions)

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod llm;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::domain::analysis::{KnowledgeGraphBuilder, ThinkingAnalyzer};
    pub use crate::domain::context::{
        ChatService, ContextAssembler, ContextConfig, ConversationContext,
    };
    pub use crate::domain::extraction::{EntityCategory, EntityExtractor, ExtractionResult, ExtractorConfig};
    pub use crate::domain::graph::{GraphStore, GraphWriter};
    pub use crate::error::{Error, Result};
    pub use crate::infrastructure::graph::SqliteGraphStore;
    pub use crate::llm::{CompletionProvider, LlmClient};
    pub use crate::storage::Database;
}
