//! End-to-end: ingest thinking, then assemble context and prompts from the graph

use std::sync::Arc;

use thinkgraph_core::domain::graph::{GraphStats, SearchHitKind, SearchKind};
use thinkgraph_core::prelude::*;

const FIRST_SESSION: &str = "I noticed the search_api returns stale results for Python queries. \
Analyzing the cache headers shows the TTL is far too long. \
I will call the search_api again with a cache bypass flag.";

const SECOND_SESSION: &str = "Observed that Python workers crash under load. \
I decided to add a retry budget to the queue consumer.";

async fn setup() -> (
    Arc<SqliteGraphStore>,
    KnowledgeGraphBuilder<SqliteGraphStore>,
    Arc<EntityExtractor>,
) {
    let db = Database::in_memory().await.expect("database");
    let store = Arc::new(SqliteGraphStore::new(db.pool().clone()));
    let extractor = Arc::new(EntityExtractor::new(ExtractorConfig::default()).expect("extractor"));
    let analyzer = ThinkingAnalyzer::new(extractor.clone()).expect("analyzer");
    let builder = KnowledgeGraphBuilder::new(store.clone(), analyzer, extractor.clone());
    (store, builder, extractor)
}

#[tokio::test]
async fn test_ingested_sessions_feed_context() {
    let (store, builder, extractor) = setup().await;
    builder
        .process_thinking(FIRST_SESSION, Some("session_a"), true)
        .await
        .unwrap();
    builder
        .process_thinking(SECOND_SESSION, Some("session_b"), true)
        .await
        .unwrap();

    let assembler = ContextAssembler::new(store.clone(), extractor).unwrap();
    let context = assembler
        .get_conversation_context("How should I cache Python results?", "session_new")
        .await;

    assert!(context.has_context());
    assert!(context.extracted_entities.iter().any(|m| m == "Python"));

    let python = context
        .related_entities
        .iter()
        .find(|e| e.name.eq_ignore_ascii_case("python"))
        .expect("Python should be in the graph");
    assert!(python.mention_count >= 2);

    let sessions: Vec<&str> = context
        .similar_sessions
        .iter()
        .map(|s| s.session_id.as_str())
        .collect();
    assert!(sessions.contains(&"session_a"));
    assert!(sessions.contains(&"session_b"));

    assert!(context.context_summary.starts_with("Previously discussed: "));
    assert!(context.context_summary.ends_with('.'));

    let prompt = assembler.build_enhanced_prompt("How should I cache Python results?", &context);
    assert!(prompt.contains("\n\nContext: Previously discussed"));
    assert!(prompt.ends_with("\n\nCurrent question: How should I cache Python results?"));

    let metadata = assembler.get_context_metadata(&context);
    assert!(metadata.used_context);
    assert_eq!(metadata.similar_sessions_count, context.similar_sessions.len());
}

#[tokio::test]
async fn test_current_session_is_not_similar_to_itself() {
    let (store, builder, extractor) = setup().await;
    builder
        .process_thinking(FIRST_SESSION, Some("session_a"), true)
        .await
        .unwrap();

    let assembler = ContextAssembler::new(store, extractor).unwrap();
    let context = assembler
        .get_conversation_context("Is Python still returning stale data?", "session_a")
        .await;

    assert!(context.similar_sessions.iter().all(|s| s.session_id != "session_a"));
    assert!(
        context
            .related_thoughts
            .iter()
            .any(|t| t.session_id == "session_a")
    );
}

#[tokio::test]
async fn test_unknown_topics_yield_no_context() {
    let (store, builder, extractor) = setup().await;
    builder
        .process_thinking(FIRST_SESSION, Some("session_a"), true)
        .await
        .unwrap();

    let assembler = ContextAssembler::new(store, extractor).unwrap();
    let context = assembler
        .get_conversation_context("Tell me about Kubernetes", "session_x")
        .await;

    assert!(context.related_thoughts.is_empty());
    assert_eq!(
        context.context_summary,
        "No relevant context found from previous conversations."
    );
}

#[tokio::test]
async fn test_patterns_and_stats_after_ingest() {
    let (store, builder, _) = setup().await;
    builder
        .process_thinking(FIRST_SESSION, Some("session_a"), true)
        .await
        .unwrap();
    builder
        .process_thinking(SECOND_SESSION, Some("session_b"), true)
        .await
        .unwrap();

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.sessions, 2);
    assert_eq!(stats.thoughts, 5);
    assert_eq!(stats.reasoning_flows, 3);

    let patterns = builder.analyze_patterns().await.unwrap();
    let sequential = patterns
        .reasoning_patterns
        .iter()
        .find(|p| p.strategy == "sequential" && p.domain == "general")
        .expect("fallback strategy pattern");
    assert_eq!(sequential.frequency, 2);

    let search = patterns
        .tool_usage_patterns
        .iter()
        .find(|p| p.tool_name == "search_api")
        .expect("search_api tool usage");
    assert_eq!(search.usage_count, 2);

    store.clear().await.unwrap();
    assert_eq!(store.stats().await.unwrap(), GraphStats::default());
}

#[tokio::test]
async fn test_search_and_node_details_after_ingest() {
    let (store, builder, _) = setup().await;
    builder
        .process_thinking(FIRST_SESSION, Some("session_a"), true)
        .await
        .unwrap();
    builder
        .process_thinking(SECOND_SESSION, Some("session_b"), true)
        .await
        .unwrap();

    let hits = store.search("STALE", SearchKind::All, 10).await.unwrap();
    assert!(hits.iter().any(|h| h.kind == SearchHitKind::Thought
        && h.session_id.as_deref() == Some("session_a")
        && h.snippet.contains("stale")));

    let python = store.node_detail("python").await.unwrap().expect("Python node");
    assert!(python.statistics.mention_count >= 2);
    assert_eq!(python.statistics.session_count, 2);

    let timeline = store.node_timeline("Python", 10).await.unwrap();
    let sessions: Vec<&str> = timeline.iter().map(|e| e.session_id.as_str()).collect();
    assert_eq!(sessions.len(), 2);
    assert!(sessions.contains(&"session_a") && sessions.contains(&"session_b"));
    assert!(timeline.iter().all(|e| !e.thoughts.is_empty()));
}
