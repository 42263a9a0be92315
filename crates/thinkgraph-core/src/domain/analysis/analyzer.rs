//! Thinking text analysis
//!
//! Turns free-form agent reasoning into ordered thoughts, the entities and
//! tools they mention, and the flows between them. A [`CompletionProvider`]
//! is asked for a JSON analysis when configured; otherwise, or when the model
//! answer is unusable, a sentence-level regex analysis is used.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::context::mentions::single_quoted;
use crate::domain::extraction::EntityExtractor;
use crate::domain::extraction::scoring::is_noise;
use crate::domain::graph::{FlowType, ThoughtType};
use crate::error::{Error, Result};
use crate::llm::{CompletionProvider, Message};

/// Confidence given to every fallback thought
const FALLBACK_CONFIDENCE: f32 = 0.7;

/// Strength of the sequential flows the fallback creates
const FALLBACK_FLOW_STRENGTH: f32 = 0.8;

pub const FALLBACK_STRATEGY: &str = "sequential";
pub const FALLBACK_DOMAIN: &str = "general";

const ANALYSIS_INSTRUCTIONS: &str = r#"Analyze the agent thinking process below and answer with a single JSON object of this shape:
{
  "thoughts": [
    {"content": "one reasoning step", "type": "observation|analysis|decision|action|reflection",
     "entities": ["entity"], "tools_mentioned": ["tool"], "confidence": 0.8}
  ],
  "relationships": [
    {"source_thought": 0, "target_thought": 1, "relationship": "leads_to|depends_on|supports|contradicts", "strength": 0.9}
  ],
  "reasoning_strategy": "step_by_step|tool_selection|problem_decomposition|verification",
  "domain": "short topic label",
  "success_indicators": ["indicator"]
}
Extract each reasoning step as its own thought, name the entities (functions, parameters, places, concepts) and tools or APIs it mentions, judge confidence from the certainty of the language, and link thoughts by their position in the list."#;

/// One analyzed reasoning step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedThought {
    pub content: String,
    pub thought_type: ThoughtType,
    pub entities: Vec<String>,
    pub tools: Vec<String>,
    pub confidence: f32,
}

/// Flow between two thoughts, by position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedRelationship {
    pub source: usize,
    pub target: usize,
    pub flow_type: FlowType,
    pub strength: f32,
}

/// Structured view of a thinking text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedThinking {
    pub thoughts: Vec<AnalyzedThought>,
    /// Only indices inside `thoughts`
    pub relationships: Vec<AnalyzedRelationship>,
    pub reasoning_strategy: String,
    pub domain: String,
    pub success_indicators: Vec<String>,
}

impl AnalyzedThinking {
    pub fn empty() -> Self {
        Self {
            thoughts: Vec::new(),
            relationships: Vec::new(),
            reasoning_strategy: FALLBACK_STRATEGY.to_string(),
            domain: FALLBACK_DOMAIN.to_string(),
            success_indicators: Vec::new(),
        }
    }
}

/// Compiled patterns of the regex analysis
#[derive(Debug, Clone)]
struct FallbackPatterns {
    sentence_breaks: Regex,
    classifiers: Vec<(ThoughtType, Regex)>,
    double_quoted: Regex,
    identifiers: Regex,
    tools: Regex,
}

impl FallbackPatterns {
    fn new() -> Result<Self> {
        let classifiers = [
            (ThoughtType::Observation, r"(?i)\b(?:observ\w*|see[ns]?|notic\w*|found)\b"),
            (ThoughtType::Analysis, r"(?i)\b(?:analy[sz]\w*|determin\w*|identif\w*)\b"),
            (ThoughtType::Decision, r"(?i)\b(?:decid\w*|choos\w*|chose|will)\b"),
            (ThoughtType::Action, r"(?i)\b(?:call\w*|execut\w*|run\w*|ran|invok\w*)\b"),
        ]
        .into_iter()
        .map(|(kind, pattern)| Ok((kind, compile(kind.as_str(), pattern)?)))
        .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            sentence_breaks: compile("sentences", r"[.!?]+")?,
            classifiers,
            double_quoted: compile("quoted", r#""([^"]+)""#)?,
            identifiers: compile(
                "identifiers",
                r"\b[a-z][a-z0-9]*(?:_[a-zA-Z0-9]+)+\b|\b[a-z][a-z0-9]*(?:[A-Z][a-z0-9]*)+\b",
            )?,
            tools: compile("tools", r"(?i)\b\w+(?:API|_api|Tool|Service)\b")?,
        })
    }

    fn classify(&self, sentence: &str) -> ThoughtType {
        self.classifiers
            .iter()
            .find(|(_, re)| re.is_match(sentence))
            .map(|(kind, _)| *kind)
            .unwrap_or_default()
    }
}

fn compile(name: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::InvalidPattern {
        category: name.to_string(),
        message: e.to_string(),
    })
}

/// Analyzes thinking text into thoughts and flows
pub struct ThinkingAnalyzer {
    extractor: Arc<EntityExtractor>,
    provider: Option<Arc<dyn CompletionProvider>>,
    patterns: FallbackPatterns,
}

impl ThinkingAnalyzer {
    /// Analyzer using only the regex analysis
    pub fn new(extractor: Arc<EntityExtractor>) -> Result<Self> {
        Ok(Self {
            extractor,
            provider: None,
            patterns: FallbackPatterns::new()?,
        })
    }

    /// Ask `provider` for a JSON analysis first
    pub fn with_provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Analyze `text`. Never fails; any model problem falls back to the regex analysis.
    pub async fn analyze(&self, text: &str) -> AnalyzedThinking {
        if text.trim().is_empty() {
            return AnalyzedThinking::empty();
        }

        if let Some(provider) = &self.provider {
            match self.analyze_with_model(provider.as_ref(), text).await {
                Ok(analysis) => return analysis,
                Err(e) => warn!(error = %e, "Model analysis failed, using regex analysis"),
            }
        }
        self.fallback_analysis(text)
    }

    async fn analyze_with_model(
        &self,
        provider: &dyn CompletionProvider,
        text: &str,
    ) -> Result<AnalyzedThinking> {
        let messages = vec![
            Message::system(ANALYSIS_INSTRUCTIONS),
            Message::user(format!("Text:\n{}", text)),
        ];
        let response = provider.complete_json(messages).await?;
        let analysis = parse_model_analysis(&response.content)?;
        debug!(
            model = %response.model,
            thoughts = analysis.thoughts.len(),
            relationships = analysis.relationships.len(),
            "Model analysis parsed"
        );
        Ok(analysis)
    }

    /// Sentence-level analysis: one thought per sentence, linked in order
    pub fn fallback_analysis(&self, text: &str) -> AnalyzedThinking {
        let thoughts: Vec<AnalyzedThought> = self
            .patterns
            .sentence_breaks
            .split(text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|sentence| AnalyzedThought {
                content: sentence.to_string(),
                thought_type: self.patterns.classify(sentence),
                entities: self.sentence_entities(sentence),
                tools: self.sentence_tools(sentence),
                confidence: FALLBACK_CONFIDENCE,
            })
            .collect();

        let relationships = (1..thoughts.len())
            .map(|i| AnalyzedRelationship {
                source: i - 1,
                target: i,
                flow_type: FlowType::LeadsTo,
                strength: FALLBACK_FLOW_STRENGTH,
            })
            .collect();

        AnalyzedThinking {
            thoughts,
            relationships,
            ..AnalyzedThinking::empty()
        }
    }

    fn sentence_entities(&self, sentence: &str) -> Vec<String> {
        let mut candidates = self
            .extractor
            .extract_entities_with_confidence(sentence)
            .entity_names();
        candidates.extend(
            self.patterns
                .double_quoted
                .captures_iter(sentence)
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str().to_string()),
        );
        candidates.extend(single_quoted(sentence).into_iter().map(str::to_string));
        candidates.extend(
            self.patterns
                .identifiers
                .find_iter(sentence)
                .map(|m| m.as_str().to_string()),
        );
        unique_names(candidates)
    }

    fn sentence_tools(&self, sentence: &str) -> Vec<String> {
        unique_names(
            self.patterns
                .tools
                .find_iter(sentence)
                .map(|m| m.as_str().to_string()),
        )
    }
}

/// Trimmed, non-noise names, deduplicated case-insensitively in first-seen order
fn unique_names(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !is_noise(n))
        .filter(|n| seen.insert(n.to_lowercase()))
        .collect()
}

// ========== Model answer parsing ==========

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    #[serde(default)]
    thoughts: Vec<RawThought>,
    #[serde(default)]
    relationships: Vec<RawRelationship>,
    #[serde(default)]
    reasoning_strategy: Option<String>,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    success_indicators: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawThought {
    #[serde(default)]
    content: String,
    #[serde(rename = "type", default)]
    thought_type: Option<String>,
    #[serde(default)]
    entities: Vec<String>,
    #[serde(default, alias = "tools")]
    tools_mentioned: Vec<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawRelationship {
    source_thought: i64,
    target_thought: i64,
    #[serde(default)]
    relationship: Option<String>,
    #[serde(default)]
    strength: Option<f64>,
}

/// JSON object inside a model answer: fenced, bare, or surrounded by prose
pub fn extract_json_from_response(response: &str) -> Option<&str> {
    let trimmed = response.trim();

    if let Some(rest) = trimmed.strip_prefix("```") {
        let body = rest.strip_prefix("json").unwrap_or(rest);
        let body = body.trim_end().strip_suffix("```").unwrap_or(body);
        return Some(body.trim());
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (start < end).then(|| &trimmed[start..=end])
}

/// Validate a model answer into an analysis
pub fn parse_model_analysis(response: &str) -> Result<AnalyzedThinking> {
    let json = extract_json_from_response(response)
        .ok_or_else(|| Error::AnalysisFailed("no JSON object in model response".to_string()))?;
    let raw: RawAnalysis = serde_json::from_str(json)
        .map_err(|e| Error::AnalysisFailed(format!("invalid analysis JSON: {}", e)))?;

    // Blank thoughts are dropped, so positions are remapped for relationships
    let mut positions = HashMap::new();
    let mut thoughts = Vec::new();
    for (index, thought) in raw.thoughts.into_iter().enumerate() {
        let content = thought.content.trim();
        if content.is_empty() {
            continue;
        }
        positions.insert(index as i64, thoughts.len());
        thoughts.push(AnalyzedThought {
            content: content.to_string(),
            thought_type: thought
                .thought_type
                .as_deref()
                .map(ThoughtType::parse_lossy)
                .unwrap_or_default(),
            entities: unique_names(thought.entities),
            tools: unique_names(thought.tools_mentioned),
            confidence: clamp_unit(thought.confidence.unwrap_or(FALLBACK_CONFIDENCE as f64)),
        });
    }

    if thoughts.is_empty() {
        return Err(Error::AnalysisFailed("model response contained no thoughts".to_string()));
    }

    let relationships = raw
        .relationships
        .into_iter()
        .filter_map(|rel| {
            let source = *positions.get(&rel.source_thought)?;
            let target = *positions.get(&rel.target_thought)?;
            if source == target {
                return None;
            }
            Some(AnalyzedRelationship {
                source,
                target,
                flow_type: rel
                    .relationship
                    .as_deref()
                    .and_then(FlowType::parse)
                    .unwrap_or_default(),
                strength: clamp_unit(rel.strength.unwrap_or(FALLBACK_FLOW_STRENGTH as f64)),
            })
        })
        .collect();

    Ok(AnalyzedThinking {
        thoughts,
        relationships,
        reasoning_strategy: non_blank(raw.reasoning_strategy, FALLBACK_STRATEGY),
        domain: non_blank(raw.domain, FALLBACK_DOMAIN),
        success_indicators: raw
            .success_indicators
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    })
}

fn clamp_unit(value: f64) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0) as f32
}

fn non_blank(value: Option<String>, fallback: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::extraction::ExtractorConfig;
    use crate::llm::LlmResponse;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CannedProvider {
        answer: Result<String>,
        calls: AtomicUsize,
    }

    impl CannedProvider {
        fn ok(answer: &str) -> Self {
            Self {
                answer: Ok(answer.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                answer: Err(Error::LLMError("boom".into())),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for CannedProvider {
        async fn complete(&self, _messages: Vec<Message>) -> Result<LlmResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.answer {
                Ok(content) => Ok(LlmResponse {
                    content: content.clone(),
                    model: "test/model".into(),
                    input_tokens: 0,
                    output_tokens: 0,
                }),
                Err(_) => Err(Error::LLMError("boom".into())),
            }
        }
    }

    fn analyzer() -> ThinkingAnalyzer {
        let extractor = Arc::new(EntityExtractor::new(ExtractorConfig::default()).unwrap());
        ThinkingAnalyzer::new(extractor).unwrap()
    }

    #[test]
    fn test_fallback_splits_and_classifies() {
        let analysis = analyzer().fallback_analysis(
            "I notice the weather request failed. I will retry with the backup. \
             Let me call the WeatherAPI again! Maybe the cache is stale?",
        );

        let types: Vec<_> = analysis.thoughts.iter().map(|t| t.thought_type).collect();
        assert_eq!(
            types,
            vec![
                ThoughtType::Observation,
                ThoughtType::Decision,
                ThoughtType::Action,
                ThoughtType::Reflection,
            ]
        );
        assert!(analysis.thoughts.iter().all(|t| t.confidence == FALLBACK_CONFIDENCE));
        assert_eq!(analysis.reasoning_strategy, FALLBACK_STRATEGY);
        assert_eq!(analysis.domain, FALLBACK_DOMAIN);

        assert_eq!(analysis.relationships.len(), 3);
        assert!(analysis.relationships.iter().enumerate().all(|(i, r)| {
            r.source == i && r.target == i + 1 && r.flow_type == FlowType::LeadsTo && r.strength == FALLBACK_FLOW_STRENGTH
        }));
    }

    #[test]
    fn test_fallback_tools_and_identifiers() {
        let analysis = analyzer()
            .fallback_analysis("Run default_api with get_weather and the searchTool via 'Paris'");
        let thought = &analysis.thoughts[0];

        assert!(thought.tools.contains(&"default_api".to_string()));
        assert!(thought.tools.contains(&"searchTool".to_string()));
        assert!(thought.entities.contains(&"get_weather".to_string()));
        assert!(thought.entities.contains(&"searchTool".to_string()));
        assert!(thought.entities.contains(&"Paris".to_string()));
    }

    #[test]
    fn test_tool_pattern_requires_word_end() {
        let analysis = analyzer().fallback_analysis("The therapist spoke rapidly");
        assert!(analysis.thoughts[0].tools.is_empty());
    }

    #[test]
    fn test_extract_json_variants() {
        assert_eq!(extract_json_from_response("```json\n{\"a\": 1}\n```"), Some("{\"a\": 1}"));
        assert_eq!(extract_json_from_response("```\n{\"a\": 1}\n```"), Some("{\"a\": 1}"));
        assert_eq!(extract_json_from_response("Sure! {\"a\": 1} Done."), Some("{\"a\": 1}"));
        assert_eq!(extract_json_from_response("no json here"), None);
    }

    #[test]
    fn test_parse_model_analysis_sanitizes() {
        let answer = r#"```json
        {
            "thoughts": [
                {"content": "Check the forecast", "type": "action", "entities": ["forecast"], "tools_mentioned": ["WeatherAPI"], "confidence": 1.7},
                {"content": "   ", "type": "analysis"},
                {"content": "It will rain", "type": "prediction", "confidence": -0.2}
            ],
            "relationships": [
                {"source_thought": 0, "target_thought": 2, "relationship": "supports", "strength": 0.9},
                {"source_thought": 0, "target_thought": 7, "relationship": "leads_to"},
                {"source_thought": 2, "target_thought": 2},
                {"source_thought": 0, "target_thought": 1}
            ],
            "reasoning_strategy": "tool_selection",
            "domain": "weather",
            "success_indicators": ["forecast retrieved", ""]
        }
        ```"#;

        let analysis = parse_model_analysis(answer).unwrap();
        assert_eq!(analysis.thoughts.len(), 2);
        assert_eq!(analysis.thoughts[0].thought_type, ThoughtType::Action);
        assert_eq!(analysis.thoughts[0].confidence, 1.0);
        assert_eq!(analysis.thoughts[0].tools, vec!["WeatherAPI".to_string()]);
        assert_eq!(analysis.thoughts[1].thought_type, ThoughtType::Reflection);
        assert_eq!(analysis.thoughts[1].confidence, 0.0);

        assert_eq!(
            analysis.relationships,
            vec![AnalyzedRelationship {
                source: 0,
                target: 1,
                flow_type: FlowType::Supports,
                strength: 0.9,
            }]
        );
        assert_eq!(analysis.reasoning_strategy, "tool_selection");
        assert_eq!(analysis.domain, "weather");
        assert_eq!(analysis.success_indicators, vec!["forecast retrieved".to_string()]);
    }

    #[test]
    fn test_parse_rejects_empty_analysis() {
        assert!(matches!(
            parse_model_analysis(r#"{"thoughts": []}"#),
            Err(Error::AnalysisFailed(_))
        ));
        assert!(matches!(parse_model_analysis("{not json}"), Err(Error::AnalysisFailed(_))));
    }

    #[tokio::test]
    async fn test_analyze_uses_model_answer() {
        let provider = Arc::new(CannedProvider::ok(
            r#"{"thoughts": [{"content": "Look up the city", "type": "action"}], "domain": "weather"}"#,
        ));
        let analysis = analyzer()
            .with_provider(provider.clone())
            .analyze("Look up the city.")
            .await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(analysis.domain, "weather");
        assert_eq!(analysis.thoughts[0].thought_type, ThoughtType::Action);
    }

    #[tokio::test]
    async fn test_analyze_falls_back_without_retry() {
        let provider = Arc::new(CannedProvider::failing());
        let analyzer = analyzer().with_provider(provider.clone());
        let analysis = analyzer.analyze("First step. Second step.").await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(analysis, analyzer.fallback_analysis("First step. Second step."));
    }

    #[tokio::test]
    async fn test_analyze_falls_back_on_garbage() {
        let provider = Arc::new(CannedProvider::ok("I cannot help with that."));
        let analysis = analyzer().with_provider(provider).analyze("One thought here.").await;
        assert_eq!(analysis.reasoning_strategy, FALLBACK_STRATEGY);
        assert_eq!(analysis.thoughts.len(), 1);
    }

    #[tokio::test]
    async fn test_analyze_blank_text() {
        let analysis = analyzer().analyze("  ").await;
        assert!(analysis.thoughts.is_empty());
        assert!(analysis.relationships.is_empty());
    }
}
