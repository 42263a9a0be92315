//! Extraction records
//!
//! Everything here is a transient, per-call value: an [`ExtractionResult`] is
//! produced by one extraction pass and owned by the caller afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::category::EntityCategory;

/// An entity mention extracted from text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    /// Surface text of the mention
    pub name: String,
    pub category: EntityCategory,
    /// Heuristic score in [0, 1]
    pub confidence: f32,
    /// Text window around the match
    pub context: String,
    /// Occurrences folded into this entity during deduplication
    pub mentions: u32,
    /// Byte offset of the match that produced this entity
    pub position: usize,
}

impl ExtractedEntity {
    pub fn new(
        name: impl Into<String>,
        category: EntityCategory,
        confidence: f32,
        context: impl Into<String>,
        position: usize,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            confidence,
            context: context.into(),
            mentions: 1,
            position,
        }
    }
}

/// A term definition found in text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    pub definition: String,
    pub confidence: f32,
    /// The full matched sentence fragment
    pub context: String,
}

/// Aggregate output of one extraction pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Entities per category, each list sorted by confidence descending
    pub entities: BTreeMap<EntityCategory, Vec<ExtractedEntity>>,
    pub definitions: BTreeMap<String, Definition>,
    /// Mean confidence over all entities and definitions, 0 if none
    pub overall_confidence: f32,
    /// Entities across all categories plus definitions
    pub total_entities: usize,
    pub extraction_timestamp: DateTime<Utc>,
}

impl ExtractionResult {
    /// An empty result with every category present
    pub fn empty() -> Self {
        Self {
            entities: EntityCategory::ALL.iter().map(|c| (*c, Vec::new())).collect(),
            definitions: BTreeMap::new(),
            overall_confidence: 0.0,
            total_entities: 0,
            extraction_timestamp: Utc::now(),
        }
    }

    /// Build a result from deduplicated entities and definitions, deriving the aggregates
    pub fn from_parts(
        entities: BTreeMap<EntityCategory, Vec<ExtractedEntity>>,
        definitions: BTreeMap<String, Definition>,
    ) -> Self {
        let scores: Vec<f32> = entities
            .values()
            .flatten()
            .map(|e| e.confidence)
            .chain(definitions.values().map(|d| d.confidence))
            .collect();

        let overall_confidence = if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f32>() / scores.len() as f32
        };

        Self {
            total_entities: scores.len(),
            entities,
            definitions,
            overall_confidence,
            extraction_timestamp: Utc::now(),
        }
    }

    pub fn category(&self, category: EntityCategory) -> &[ExtractedEntity] {
        self.entities
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All entity names, in category order
    pub fn entity_names(&self) -> Vec<String> {
        self.entities
            .values()
            .flatten()
            .map(|e| e.name.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.total_entities == 0
    }
}

/// Confidence distribution of one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceDistribution {
    pub mean: f32,
    pub min: f32,
    pub max: f32,
}

/// A name paired with its confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedName {
    pub name: String,
    pub confidence: f32,
}

/// Summary statistics over an extraction result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EntityStatistics {
    /// Count per category name, plus `definitions`
    pub category_counts: BTreeMap<String, usize>,
    pub confidence_distribution: BTreeMap<String, ConfidenceDistribution>,
    /// Up to three names per category, highest confidence first
    pub top_entities: BTreeMap<String, Vec<RankedName>>,
}
