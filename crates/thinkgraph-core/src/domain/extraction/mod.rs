//! Entity extraction
//!
//! - `category`: the five entity categories
//! - `entity`: per-call extraction records
//! - `patterns`: declarative, precompiled pattern tables
//! - `scoring`: confidence heuristics and noise filtering
//! - `merge`: duplicate matching and the optional embedding capability
//! - `extractor`: the [`EntityExtractor`] pipeline

pub mod category;
pub mod entity;
pub mod extractor;
pub mod merge;
pub mod patterns;
pub mod scoring;

pub use category::EntityCategory;
pub use entity::{
    ConfidenceDistribution, Definition, EntityStatistics, ExtractedEntity, ExtractionResult,
    RankedName,
};
pub use extractor::{EntityExtractor, ExtractorConfig};
pub use merge::{Embedder, MergeMatch, NullEmbedder, cosine_similarity};
pub use patterns::{CategoryRules, KeywordGroup, PatternTable};
