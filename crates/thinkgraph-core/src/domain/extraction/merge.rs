//! Near-duplicate matching for entity names
//!
//! Three tiers, tried in order: exact (case-insensitive), containment
//! (substring either way, or an acronym of a multi-word name), and an optional
//! semantic tier backed by an [`Embedder`]. The first two tiers are pure and
//! independent of the order of `existing`.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};

/// Sentence-embedding capability used by the semantic merge tier
pub trait Embedder: Send + Sync {
    /// Whether the backend can be used at all
    fn is_available(&self) -> bool {
        true
    }

    /// Encode each text into a fixed-length vector
    fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;
}

/// Embedder used when no semantic backend is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEmbedder;

impl Embedder for NullEmbedder {
    fn is_available(&self) -> bool {
        false
    }

    fn encode(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Err(Error::EmbeddingUnavailable)
    }
}

/// How a candidate relates to an already accepted entity
#[derive(Debug, Clone, PartialEq)]
pub enum MergeMatch {
    /// Same name ignoring case
    Exact { index: usize },
    /// One name contains the other; `keep_candidate` when the candidate is the longer one
    Contained { index: usize, keep_candidate: bool },
    /// Embeddings are at least as similar as the threshold
    Semantic { index: usize, similarity: f32 },
}

impl MergeMatch {
    pub fn index(&self) -> usize {
        match self {
            Self::Exact { index } | Self::Contained { index, .. } | Self::Semantic { index, .. } => {
                *index
            }
        }
    }
}

/// Exact and containment tiers
pub fn lexical_match(existing: &[&str], candidate: &str) -> Option<MergeMatch> {
    if existing.is_empty() || candidate.is_empty() {
        return None;
    }

    let candidate_lower = candidate.to_lowercase();

    if let Some(index) = existing
        .iter()
        .position(|name| name.to_lowercase() == candidate_lower)
    {
        return Some(MergeMatch::Exact { index });
    }

    // Longest containing/contained name wins so the result does not depend on input order
    let best = existing
        .iter()
        .enumerate()
        .filter(|(_, name)| {
            let name_lower = name.to_lowercase();
            name_lower.contains(&candidate_lower)
                || candidate_lower.contains(&name_lower)
                || is_acronym_of(candidate, name)
                || is_acronym_of(name, candidate)
        })
        .max_by(|(_, a), (_, b)| {
            a.chars()
                .count()
                .cmp(&b.chars().count())
                .then_with(|| b.cmp(a))
        })?;

    let (index, name) = best;
    Some(MergeMatch::Contained {
        index,
        keep_candidate: candidate.chars().count() > name.chars().count(),
    })
}

/// Encode `texts` on a worker thread, giving up once `limit` elapses
///
/// An overrunning backend keeps its worker until `encode` returns; the caller
/// never waits past `limit`.
pub fn encode_within(
    embedder: &Arc<dyn Embedder>,
    texts: Vec<String>,
    limit: Duration,
) -> Result<Vec<Vec<f32>>> {
    let budget_ms = limit.as_millis() as u64;
    if limit.is_zero() {
        return Err(Error::Timeout(budget_ms));
    }

    let expected = texts.len();
    let (tx, rx) = mpsc::sync_channel(1);
    let worker = Arc::clone(embedder);
    thread::Builder::new()
        .name("thinkgraph-embed".to_string())
        .spawn(move || {
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            // The receiver is gone when the deadline already passed
            let _ = tx.send(worker.encode(&refs));
        })?;

    let vectors = match rx.recv_timeout(limit) {
        Ok(result) => result?,
        Err(RecvTimeoutError::Timeout) => return Err(Error::Timeout(budget_ms)),
        Err(RecvTimeoutError::Disconnected) => {
            return Err(Error::EmbeddingFailed(
                "embedding worker exited without a result".to_string(),
            ));
        }
    };

    if vectors.len() != expected {
        return Err(Error::EmbeddingFailed(format!(
            "expected {} vectors, got {}",
            expected,
            vectors.len()
        )));
    }
    Ok(vectors)
}

/// Semantic tier: the existing vector most similar to `candidate`, if it reaches `threshold`
pub fn best_semantic_match(
    candidate: &[f32],
    existing: &[&[f32]],
    threshold: f32,
) -> Option<MergeMatch> {
    existing
        .iter()
        .enumerate()
        .map(|(index, v)| (index, cosine_similarity(candidate, v)))
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .filter(|(_, similarity)| *similarity >= threshold)
        .map(|(index, similarity)| MergeMatch::Semantic { index, similarity })
}

/// Whether `short` is the initials of a multi-word `long`, e.g. `AI` for `Artificial Intelligence`
pub fn is_acronym_of(short: &str, long: &str) -> bool {
    let short_len = short.chars().count();
    if short_len < 2 || !short.chars().all(|c| c.is_uppercase()) {
        return false;
    }

    let initials: String = long
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect();

    initials.chars().count() >= 2 && initials == short
}

/// Cosine similarity of two vectors; 0 for mismatched or zero-length input
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Maps a few known names onto fixed vectors
    struct TableEmbedder;

    impl Embedder for TableEmbedder {
        fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| match *t {
                    "Neural Nets" | "Neural Networks" => vec![1.0, 0.0],
                    "Deep Networks" => vec![0.95, 0.05],
                    _ => vec![0.0, 1.0],
                })
                .collect())
        }
    }

    #[test]
    fn test_exact_match_ignores_case() {
        let existing = ["Machine Learning"];
        assert_eq!(
            lexical_match(&existing, "machine learning"),
            Some(MergeMatch::Exact { index: 0 })
        );
    }

    #[test]
    fn test_substring_keeps_longer() {
        let existing = ["Learning"];
        assert_eq!(
            lexical_match(&existing, "Machine Learning"),
            Some(MergeMatch::Contained { index: 0, keep_candidate: true })
        );

        let existing = ["Machine Learning"];
        assert_eq!(
            lexical_match(&existing, "Learning"),
            Some(MergeMatch::Contained { index: 0, keep_candidate: false })
        );
    }

    #[test]
    fn test_acronym_merges_with_expansion() {
        assert!(is_acronym_of("AI", "Artificial Intelligence"));
        assert!(!is_acronym_of("AI", "Intelligence"));
        assert!(!is_acronym_of("ai", "Artificial Intelligence"));

        let existing = ["AI"];
        assert_eq!(
            lexical_match(&existing, "Artificial Intelligence"),
            Some(MergeMatch::Contained { index: 0, keep_candidate: true })
        );
    }

    #[test]
    fn test_containment_is_order_independent() {
        let a = ["Rust", "Rust Language Server"];
        let b = ["Rust Language Server", "Rust"];
        let pick = |names: &[&str]| {
            lexical_match(names, "Rust Language").map(|m| names[m.index()].to_string())
        };
        assert_eq!(pick(&a), Some("Rust Language Server".to_string()));
        assert_eq!(pick(&b), Some("Rust Language Server".to_string()));
    }

    #[test]
    fn test_no_match() {
        assert_eq!(lexical_match(&["Python"], "Docker"), None);
        assert_eq!(lexical_match(&[], "Docker"), None);
    }

    #[test]
    fn test_semantic_match_threshold() {
        let embedder: Arc<dyn Embedder> = Arc::new(TableEmbedder);
        let texts = ["Neural Networks", "Kubernetes", "Deep Networks"]
            .map(String::from)
            .to_vec();
        let vectors = encode_within(&embedder, texts, Duration::from_secs(5)).unwrap();
        let existing: Vec<&[f32]> = vectors[..2].iter().map(Vec::as_slice).collect();

        let found = best_semantic_match(&vectors[2], &existing, 0.85);
        assert!(matches!(found, Some(MergeMatch::Semantic { index: 0, .. })));
        assert!(best_semantic_match(&vectors[2], &existing, 0.9999).is_none());
        assert!(best_semantic_match(&vectors[2], &[], 0.1).is_none());
    }

    #[test]
    fn test_null_embedder_error_propagates() {
        let embedder: Arc<dyn Embedder> = Arc::new(NullEmbedder);
        assert!(!embedder.is_available());
        let err = encode_within(&embedder, vec!["x".to_string()], Duration::from_secs(5));
        assert!(matches!(err, Err(Error::EmbeddingUnavailable)));
    }

    /// Blocks far longer than any budget used in these tests
    struct StuckEmbedder;

    impl Embedder for StuckEmbedder {
        fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            thread::sleep(Duration::from_secs(3));
            Ok(texts.iter().map(|_| vec![1.0]).collect())
        }
    }

    #[test]
    fn test_encode_gives_up_at_deadline() {
        let embedder: Arc<dyn Embedder> = Arc::new(StuckEmbedder);
        let started = std::time::Instant::now();
        let err = encode_within(&embedder, vec!["Python".to_string()], Duration::from_millis(50));

        assert!(matches!(err, Err(Error::Timeout(50))));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_encode_rejects_short_batches() {
        struct OneVector;
        impl Embedder for OneVector {
            fn encode(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>> {
                Ok(vec![vec![1.0]])
            }
        }
        let embedder: Arc<dyn Embedder> = Arc::new(OneVector);
        let texts = vec!["a".to_string(), "b".to_string()];
        assert!(matches!(
            encode_within(&embedder, texts, Duration::from_secs(5)),
            Err(Error::EmbeddingFailed(_))
        ));
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
