//! Pattern-based entity and definition extraction
//!
//! [`EntityExtractor`] is an immutable value: compiled pattern tables, thresholds,
//! and an embedding handle. It is constructed once and shared (typically behind an
//! `Arc`) by every caller; extraction itself holds no state between calls.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use regex::Captures;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::category::EntityCategory;
use super::entity::{
    ConfidenceDistribution, Definition, EntityStatistics, ExtractedEntity, ExtractionResult,
    RankedName,
};
use super::merge::{
    Embedder, MergeMatch, NullEmbedder, best_semantic_match, encode_within, lexical_match,
};
use super::patterns::{CompiledCategory, PatternTable};
use super::scoring::{calculate_confidence_score, calculate_definition_confidence, is_noise};
use crate::error::Result;

/// Number of names reported per category in [`EntityStatistics`]
const TOP_ENTITIES: usize = 3;

/// Extraction thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Minimum confidence for an entity or definition to be kept
    pub confidence_threshold: f32,
    /// Minimum cosine similarity for a semantic merge
    pub similarity_threshold: f32,
    /// Characters of context captured on each side of a match
    pub context_radius: usize,
    /// Shortest accepted definition term, in characters
    pub min_term_len: usize,
    /// Shortest accepted definition body, in characters
    pub min_definition_len: usize,
    /// Time budget for semantic merging within one extraction call
    pub semantic_timeout_ms: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            similarity_threshold: 0.85,
            context_radius: 50,
            min_term_len: 3,
            min_definition_len: 10,
            semantic_timeout_ms: 250,
        }
    }
}

impl ExtractorConfig {
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }
}

/// Semantic merge state for one extraction call
///
/// Every `encode` runs against the time left until `deadline`; the first
/// timeout or backend error switches the tier off for the rest of the call.
/// Vectors are cached by name, so each distinct name is encoded at most once.
struct SemanticSession {
    embedder: Option<Arc<dyn Embedder>>,
    deadline: Instant,
    budget_ms: u64,
    vectors: HashMap<String, Vec<f32>>,
}

impl SemanticSession {
    fn new(embedder: &Arc<dyn Embedder>, budget_ms: u64) -> Self {
        Self {
            embedder: embedder.is_available().then(|| Arc::clone(embedder)),
            deadline: Instant::now() + Duration::from_millis(budget_ms),
            budget_ms,
            vectors: HashMap::new(),
        }
    }

    fn disabled() -> Self {
        Self {
            embedder: None,
            deadline: Instant::now(),
            budget_ms: 0,
            vectors: HashMap::new(),
        }
    }

    fn find(&mut self, existing: &[&str], candidate: &str, threshold: f32) -> Option<MergeMatch> {
        let embedder = self.embedder.clone()?;
        if existing.is_empty() {
            return None;
        }

        let mut missing: Vec<String> = Vec::new();
        for name in existing.iter().copied().chain([candidate]) {
            if !self.vectors.contains_key(name) && !missing.iter().any(|m| m == name) {
                missing.push(name.to_string());
            }
        }

        if !missing.is_empty() {
            let remaining = self.deadline.saturating_duration_since(Instant::now());
            match encode_within(&embedder, missing.clone(), remaining) {
                Ok(vectors) => self.vectors.extend(missing.into_iter().zip(vectors)),
                Err(e) => {
                    warn!(
                        error = %e,
                        budget_ms = self.budget_ms,
                        "Semantic merge unavailable, continuing with lexical merging"
                    );
                    self.embedder = None;
                    return None;
                }
            }
        }

        let candidate_vec = self.vectors.get(candidate)?;
        let existing_vecs: Vec<&[f32]> = existing
            .iter()
            .map(|name| self.vectors.get(*name).map(Vec::as_slice))
            .collect::<Option<_>>()?;
        best_semantic_match(candidate_vec, &existing_vecs, threshold)
    }
}

/// Multi-category entity and definition extractor
#[derive(Clone)]
pub struct EntityExtractor {
    config: ExtractorConfig,
    patterns: Arc<PatternTable>,
    embedder: Arc<dyn Embedder>,
}

impl std::fmt::Debug for EntityExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityExtractor")
            .field("config", &self.config)
            .field("semantic", &self.embedder.is_available())
            .finish()
    }
}

impl EntityExtractor {
    /// Create an extractor with the built-in pattern tables and no semantic backend
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        Ok(Self::with_patterns(config, Arc::new(PatternTable::builtin()?)))
    }

    /// Create an extractor over an already compiled pattern table
    pub fn with_patterns(config: ExtractorConfig, patterns: Arc<PatternTable>) -> Self {
        Self {
            config,
            patterns,
            embedder: Arc::new(NullEmbedder),
        }
    }

    /// Attach a semantic-similarity backend
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = embedder;
        self
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract categorized, confidence-scored entities and definitions from text
    pub fn extract_entities_with_confidence(&self, text: &str) -> ExtractionResult {
        if text.trim().is_empty() {
            return ExtractionResult::empty();
        }

        debug!(text_len = text.len(), "Extracting entities");

        let mut semantic = SemanticSession::new(&self.embedder, self.config.semantic_timeout_ms);
        let mut entities = BTreeMap::new();

        for rules in self.patterns.categories() {
            let candidates = self.extract_category(text, rules);
            let merged = self.deduplicate_with(candidates, &mut semantic);
            entities.insert(rules.category, merged);
        }

        // Categories without rules still appear in the result
        for category in EntityCategory::ALL {
            entities.entry(category).or_insert_with(Vec::new);
        }

        let definitions = self.extract_definitions(text);
        let result = ExtractionResult::from_parts(entities, definitions);

        debug!(
            total_entities = result.total_entities,
            overall_confidence = result.overall_confidence,
            "Extraction complete"
        );

        result
    }

    fn extract_category(&self, text: &str, rules: &CompiledCategory) -> Vec<ExtractedEntity> {
        let mut found = Vec::new();

        for pattern in &rules.patterns {
            for caps in pattern.captures_iter(text) {
                let Some(whole) = caps.get(0) else {
                    continue;
                };
                let surface = first_group(&caps).trim();
                if is_noise(surface) {
                    continue;
                }

                let context = context_window(text, whole.start(), whole.end(), self.config.context_radius);
                let confidence = calculate_confidence_score(surface, context, &rules.keywords);

                if confidence >= self.config.confidence_threshold {
                    found.push(ExtractedEntity::new(
                        surface,
                        rules.category,
                        confidence,
                        context,
                        whole.start(),
                    ));
                }
            }
        }

        found
    }

    fn extract_definitions(&self, text: &str) -> BTreeMap<String, Definition> {
        let mut definitions: BTreeMap<String, Definition> = BTreeMap::new();

        for pattern in self.patterns.definitions() {
            for caps in pattern.captures_iter(text) {
                let (Some(whole), Some(term), Some(body)) = (caps.get(0), caps.get(1), caps.get(2))
                else {
                    continue;
                };
                let term = term.as_str().trim();
                let body = body.as_str().trim();

                if term.chars().count() < self.config.min_term_len
                    || body.chars().count() < self.config.min_definition_len
                    || is_noise(term)
                {
                    continue;
                }

                let confidence = calculate_definition_confidence(term, body, whole.as_str());
                if confidence < self.config.confidence_threshold {
                    continue;
                }

                let better = definitions
                    .get(term)
                    .is_none_or(|existing| confidence > existing.confidence);
                if better {
                    definitions.insert(
                        term.to_string(),
                        Definition {
                            definition: body.to_string(),
                            confidence,
                            context: whole.as_str().trim().to_string(),
                        },
                    );
                }
            }
        }

        definitions
    }

    /// Decide whether `candidate` duplicates one of `existing`
    ///
    /// Returns the canonical name to keep: the matched existing name, or the
    /// candidate itself when it is the longer half of a containment match.
    pub fn merge_similar_entities(&self, existing: &[&str], candidate: &str) -> Option<String> {
        let mut semantic = SemanticSession::new(&self.embedder, self.config.semantic_timeout_ms);
        self.find_match(existing, candidate, &mut semantic)
            .map(|m| match m {
                MergeMatch::Contained { keep_candidate: true, .. } => candidate.to_string(),
                other => existing[other.index()].to_string(),
            })
    }

    /// Collapse duplicates within one category and sort by confidence descending
    pub fn deduplicate_entities(&self, candidates: Vec<ExtractedEntity>) -> Vec<ExtractedEntity> {
        let mut semantic = SemanticSession::new(&self.embedder, self.config.semantic_timeout_ms);
        self.deduplicate_with(candidates, &mut semantic)
    }

    /// Same as [`Self::deduplicate_entities`] but without the semantic tier
    pub fn deduplicate_lexical(&self, candidates: Vec<ExtractedEntity>) -> Vec<ExtractedEntity> {
        self.deduplicate_with(candidates, &mut SemanticSession::disabled())
    }

    fn find_match(
        &self,
        existing: &[&str],
        candidate: &str,
        semantic: &mut SemanticSession,
    ) -> Option<MergeMatch> {
        if let Some(found) = lexical_match(existing, candidate) {
            return Some(found);
        }
        semantic.find(existing, candidate, self.config.similarity_threshold)
    }

    fn deduplicate_with(
        &self,
        candidates: Vec<ExtractedEntity>,
        semantic: &mut SemanticSession,
    ) -> Vec<ExtractedEntity> {
        let mut unique: Vec<ExtractedEntity> = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let names: Vec<&str> = unique.iter().map(|e| e.name.as_str()).collect();
            let found = self.find_match(&names, &candidate.name, semantic);

            match found {
                None => unique.push(candidate),
                Some(MergeMatch::Contained { index, keep_candidate: true }) => {
                    let previous = std::mem::replace(&mut unique[index], candidate);
                    fold_into(&mut unique[index], &previous);
                    absorb_contained(&mut unique, index);
                }
                Some(other) => {
                    let index = other.index();
                    fold_into(&mut unique[index], &candidate);
                }
            }
        }

        unique.retain(|e| !is_noise(&e.name));
        unique.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        unique
    }

    /// Per-category counts, confidence distribution and top names
    pub fn entity_statistics(&self, result: &ExtractionResult) -> EntityStatistics {
        let mut stats = EntityStatistics::default();

        for (category, list) in &result.entities {
            let ranked: Vec<RankedName> = list
                .iter()
                .map(|e| RankedName {
                    name: e.name.clone(),
                    confidence: e.confidence,
                })
                .collect();
            record_statistics(&mut stats, category.as_str(), ranked);
        }

        let definitions: Vec<RankedName> = result
            .definitions
            .iter()
            .map(|(term, d)| RankedName {
                name: term.clone(),
                confidence: d.confidence,
            })
            .collect();
        record_statistics(&mut stats, "definitions", definitions);

        stats
    }
}

fn record_statistics(stats: &mut EntityStatistics, key: &str, mut ranked: Vec<RankedName>) {
    stats.category_counts.insert(key.to_string(), ranked.len());
    if ranked.is_empty() {
        return;
    }

    let scores: Vec<f32> = ranked.iter().map(|r| r.confidence).collect();
    let mean = scores.iter().sum::<f32>() / scores.len() as f32;
    let min = scores.iter().copied().fold(f32::INFINITY, f32::min);
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    stats
        .confidence_distribution
        .insert(key.to_string(), ConfidenceDistribution { mean, min, max });

    ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    ranked.truncate(TOP_ENTITIES);
    stats.top_entities.insert(key.to_string(), ranked);
}

/// Fold a duplicate's mention count and confidence into the kept entity
fn fold_into(kept: &mut ExtractedEntity, duplicate: &ExtractedEntity) {
    kept.mentions += duplicate.mentions;
    kept.confidence = kept.confidence.max(duplicate.confidence);
}

/// After `unique[index]` grew into a longer name, fold any other entry it now covers
fn absorb_contained(unique: &mut Vec<ExtractedEntity>, index: usize) {
    let mut i = 0;
    let mut index = index;
    while i < unique.len() {
        if i != index && lexical_match(&[unique[index].name.as_str()], &unique[i].name).is_some() {
            let removed = unique.remove(i);
            if i < index {
                index -= 1;
            }
            fold_into(&mut unique[index], &removed);
        } else {
            i += 1;
        }
    }
}

/// First participating capture group, or the whole match
fn first_group<'t>(caps: &Captures<'t>) -> &'t str {
    caps.iter()
        .skip(1)
        .flatten()
        .next()
        .or_else(|| caps.get(0))
        .map(|m| m.as_str())
        .unwrap_or("")
}

/// Up to `radius` characters either side of `start..end`, trimmed
fn context_window(text: &str, start: usize, end: usize, radius: usize) -> &str {
    let from = text[..start]
        .char_indices()
        .rev()
        .take(radius)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(start);
    let to = text[end..]
        .char_indices()
        .nth(radius)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());
    text[from..to].trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn extractor() -> EntityExtractor {
        EntityExtractor::new(ExtractorConfig::default()).unwrap()
    }

    fn entity(name: &str, confidence: f32) -> ExtractedEntity {
        ExtractedEntity::new(name, EntityCategory::Concepts, confidence, name, 0)
    }

    struct FailingEmbedder {
        calls: AtomicUsize,
    }

    impl Embedder for FailingEmbedder {
        fn encode(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::EmbeddingFailed("model not loaded".to_string()))
        }
    }

    /// Treats every pair of names as identical
    struct ConstantEmbedder;

    impl Embedder for ConstantEmbedder {
        fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 1.0]).collect())
        }
    }

    #[test]
    fn test_empty_and_blank_input() {
        let extractor = extractor();
        for text in ["", "   ", "\n\t "] {
            let result = extractor.extract_entities_with_confidence(text);
            assert_eq!(result.total_entities, 0);
            assert_eq!(result.overall_confidence, 0.0);
            assert_eq!(result.entities.len(), EntityCategory::ALL.len());
        }
    }

    #[test]
    fn test_end_to_end_scenario() {
        let result = extractor().extract_entities_with_confidence(
            "Dr. Alice Smith discussed Machine Learning using Python at Stanford",
        );

        let find = |category: EntityCategory, name: &str| {
            result
                .category(category)
                .iter()
                .find(|e| e.name == name)
                .cloned()
        };

        let alice = find(EntityCategory::People, "Alice Smith").expect("person");
        let ml = find(EntityCategory::Concepts, "Machine Learning").expect("concept");
        let python = find(EntityCategory::Tools, "Python").expect("tool");
        let stanford = find(EntityCategory::Locations, "Stanford").expect("location");

        assert_eq!(alice.confidence, 0.9);
        assert_eq!(alice.mentions, 2);
        assert_eq!(ml.confidence, 0.8);
        assert_eq!(python.confidence, 0.9);
        assert_eq!(stanford.confidence, 0.7);

        for e in result.entities.values().flatten() {
            assert!(e.confidence >= 0.7);
            assert!((0.0..=1.0).contains(&e.confidence));
        }
        assert_eq!(result.total_entities, 4);
        assert!(result.definitions.is_empty());
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let extractor = extractor();
        let text = "Prof. Grace Hopper wrote about Kubernetes. The term compiler means a program that translates source code.";
        let mut first = extractor.extract_entities_with_confidence(text);
        let second = extractor.extract_entities_with_confidence(text);
        first.extraction_timestamp = second.extraction_timestamp;
        assert_eq!(first, second);
    }

    #[test]
    fn test_overall_confidence_is_mean() {
        let result = extractor().extract_entities_with_confidence(
            "Dr. Alice Smith discussed Machine Learning using Python at Stanford",
        );
        let scores: Vec<f32> = result
            .entities
            .values()
            .flatten()
            .map(|e| e.confidence)
            .chain(result.definitions.values().map(|d| d.confidence))
            .collect();
        let mean = scores.iter().sum::<f32>() / scores.len() as f32;
        assert!((result.overall_confidence - mean).abs() < 1e-6);
    }

    #[test]
    fn test_stop_words_never_appear() {
        let result = extractor().extract_entities_with_confidence(
            "The team said the plan was fine. Using The library with The tool.",
        );
        for e in result.entities.values().flatten() {
            assert_ne!(e.name.to_lowercase(), "the");
        }
    }

    #[test]
    fn test_case_duplicates_collapse() {
        let merged = extractor().deduplicate_entities(vec![
            entity("Machine Learning", 0.8),
            entity("machine learning", 0.7),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "Machine Learning");
        assert_eq!(merged[0].mentions, 2);
        assert_eq!(merged[0].confidence, 0.8);
    }

    #[test]
    fn test_substring_merge_keeps_longer() {
        let merged = extractor().deduplicate_entities(vec![
            entity("AI", 0.7),
            entity("Artificial Intelligence", 0.9),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "Artificial Intelligence");
        assert_eq!(merged[0].mentions, 2);

        let merged = extractor().deduplicate_entities(vec![
            entity("Artificial Intelligence", 0.9),
            entity("AI", 0.7),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "Artificial Intelligence");
    }

    #[test]
    fn test_longer_name_absorbs_covered_entries() {
        let merged = extractor().deduplicate_entities(vec![
            entity("Deep", 0.7),
            entity("Networks", 0.8),
            entity("Deep Networks", 0.75),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "Deep Networks");
        assert_eq!(merged[0].mentions, 3);
        assert_eq!(merged[0].confidence, 0.8);
    }

    #[test]
    fn test_sorted_by_confidence() {
        let merged = extractor().deduplicate_entities(vec![
            entity("Rust", 0.7),
            entity("Docker", 0.9),
            entity("Python", 0.8),
        ]);
        let names: Vec<_> = merged.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Docker", "Python", "Rust"]);
    }

    #[test]
    fn test_merge_similar_entities() {
        let extractor = extractor();
        assert_eq!(
            extractor.merge_similar_entities(&["AI"], "Artificial Intelligence"),
            Some("Artificial Intelligence".to_string())
        );
        assert_eq!(
            extractor.merge_similar_entities(&["Machine Learning"], "machine learning"),
            Some("Machine Learning".to_string())
        );
        assert_eq!(extractor.merge_similar_entities(&["Python"], "Docker"), None);
        assert_eq!(extractor.merge_similar_entities(&[], "Docker"), None);
    }

    #[test]
    fn test_semantic_failure_is_skipped() {
        let embedder = Arc::new(FailingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let extractor = extractor().with_embedder(embedder.clone());

        let merged = extractor.deduplicate_entities(vec![
            entity("Python", 0.9),
            entity("Docker", 0.8),
            entity("Kubernetes", 0.7),
        ]);
        assert_eq!(merged.len(), 3);
        // Tier disabled after the first failure
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_semantic_merge_prefers_existing() {
        let config = ExtractorConfig {
            semantic_timeout_ms: 60_000,
            ..Default::default()
        };
        let extractor = EntityExtractor::new(config)
            .unwrap()
            .with_embedder(Arc::new(ConstantEmbedder));

        let merged = extractor.deduplicate_entities(vec![
            entity("Neural Networks", 0.8),
            entity("Perceptrons", 0.9),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "Neural Networks");
        assert_eq!(merged[0].confidence, 0.9);
    }

    #[test]
    fn test_zero_budget_disables_semantic_tier() {
        let config = ExtractorConfig {
            semantic_timeout_ms: 0,
            ..Default::default()
        };
        let extractor = EntityExtractor::new(config)
            .unwrap()
            .with_embedder(Arc::new(ConstantEmbedder));

        let merged = extractor.deduplicate_entities(vec![
            entity("Neural Networks", 0.8),
            entity("Perceptrons", 0.9),
        ]);
        assert_eq!(merged.len(), 2);
    }

    /// Sleeps well past the extraction budget on every call
    struct SlowEmbedder {
        calls: AtomicUsize,
    }

    impl Embedder for SlowEmbedder {
        fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_secs(3));
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    #[test]
    fn test_slow_embedder_cannot_stall_extraction() {
        let embedder = Arc::new(SlowEmbedder {
            calls: AtomicUsize::new(0),
        });
        let config = ExtractorConfig {
            semantic_timeout_ms: 50,
            ..Default::default()
        };
        let extractor = EntityExtractor::new(config)
            .unwrap()
            .with_embedder(embedder.clone());

        let started = Instant::now();
        let result = extractor
            .extract_entities_with_confidence("Using Python and Docker with Kubernetes for Rust tooling");
        let elapsed = started.elapsed();

        assert!(elapsed < Duration::from_secs(1), "extraction took {elapsed:?}");
        assert!(result.total_entities >= 2);
        // Tier switched off after the first overrun
        assert!(embedder.calls.load(Ordering::SeqCst) <= 1);
    }

    /// Counts every text it is asked to encode; all names are orthogonal
    struct CountingEmbedder {
        texts: AtomicUsize,
    }

    impl Embedder for CountingEmbedder {
        fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            self.texts.fetch_add(texts.len(), Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0; 8];
                    v[t.len() % 8] = 1.0;
                    v
                })
                .collect())
        }
    }

    #[test]
    fn test_each_name_encoded_once_per_call() {
        let embedder = Arc::new(CountingEmbedder {
            texts: AtomicUsize::new(0),
        });
        let config = ExtractorConfig {
            semantic_timeout_ms: 60_000,
            ..Default::default()
        };
        let extractor = EntityExtractor::new(config)
            .unwrap()
            .with_embedder(embedder.clone());

        // Lengths 2..=5 land on distinct axes, so nothing merges
        let merged = extractor.deduplicate_entities(vec![
            entity("Go", 0.9),
            entity("Zig", 0.8),
            entity("Java", 0.7),
            entity("Scala", 0.75),
        ]);
        assert_eq!(merged.len(), 4);
        assert_eq!(embedder.texts.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_definitions_extracted() {
        let result = extractor().extract_entities_with_confidence(
            "A monad refers to a design pattern for chaining computations with context.",
        );
        let definition = result.definitions.get("A monad").expect("definition");
        assert!(definition.definition.starts_with("a design pattern"));
        assert!(definition.confidence >= 0.7);
    }

    #[test]
    fn test_short_definitions_discarded() {
        let result = extractor().extract_entities_with_confidence("Go is fast.");
        assert!(result.definitions.is_empty());
    }

    #[test]
    fn test_context_window_respects_char_boundaries() {
        let text = "ééééé Python ééééé";
        let start = text.find("Python").unwrap();
        let window = context_window(text, start, start + "Python".len(), 3);
        assert_eq!(window, "éé Python éé");
    }

    #[test]
    fn test_entity_statistics() {
        let extractor = extractor();
        let result = extractor.extract_entities_with_confidence(
            "Dr. Alice Smith discussed Machine Learning using Python at Stanford",
        );
        let stats = extractor.entity_statistics(&result);

        assert_eq!(stats.category_counts["people"], 1);
        assert_eq!(stats.category_counts["temporal_events"], 0);
        assert_eq!(stats.category_counts["definitions"], 0);
        assert!(stats.confidence_distribution.contains_key("tools"));
        assert!(!stats.confidence_distribution.contains_key("temporal_events"));
        assert_eq!(stats.top_entities["tools"][0].name, "Python");
    }
}
