//! Thinkgraph CLI - turn agent thinking into a queryable knowledge graph

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use serde::Serialize;
use thinkgraph_core::config::Config;
use thinkgraph_core::domain::analysis::{KnowledgeGraphBuilder, ThinkingAnalyzer};
use thinkgraph_core::domain::context::{
    ChatService, ContextAssembler, ConversationContext, get_context_metadata,
};
use thinkgraph_core::domain::extraction::{EntityCategory, EntityExtractor, ExtractionResult};
use thinkgraph_core::domain::graph::{GraphWriter, SearchHitKind, SearchKind};
use thinkgraph_core::infrastructure::graph::SqliteGraphStore;
use thinkgraph_core::llm::{CompletionProvider, LlmClient};
use thinkgraph_core::storage::{Database, DatabaseConfig};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "thinkgraph")]
#[command(author, version, about = "Knowledge graph of agent thinking with context-aware chat", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Database file (defaults to graph.db in the config directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze thinking text and store it as a session
    Ingest {
        /// File to read, or `-` for stdin
        input: String,
        /// Session id (generated when omitted)
        #[arg(short, long)]
        session_id: Option<String>,
        /// Keep an existing session with the same id
        #[arg(long)]
        no_overwrite: bool,
        /// Ask the configured model for the analysis
        #[arg(long)]
        llm: bool,
    },

    /// Extract entities and definitions from text (no database needed)
    Extract {
        /// Text to analyze
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        text: Option<String>,
        /// Read the text from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Include per-category statistics
        #[arg(long)]
        stats: bool,
    },

    /// Show the graph context for a message
    Context { session_id: String, input: String },

    /// Show the context-enhanced prompt for a message
    Prompt { session_id: String, input: String },

    /// Context-aware completion (needs THINKGRAPH_API_KEY or OPENROUTER_API_KEY)
    Chat {
        session_id: String,
        input: String,
        /// Model to use instead of llm.default_model
        #[arg(short, long)]
        model: Option<String>,
    },

    /// List sessions, or show one session's thoughts
    Sessions {
        id: Option<String>,
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Delete the session instead of showing it
        #[arg(long, requires = "id")]
        delete: bool,
    },

    /// Search entity names, definitions and thought content
    Search {
        query: String,
        #[arg(short, long, value_enum, default_value = "all")]
        kind: SearchScope,
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show an entity with its statistics, connections and timeline
    Node {
        name: String,
        /// Connections and timeline sessions to list
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Reasoning and tool usage patterns
    Patterns,

    /// Graph statistics
    Stats,

    /// Delete every node and edge
    Clear {
        #[arg(long)]
        force: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum SearchScope {
    All,
    Entities,
    Thoughts,
}

impl From<SearchScope> for SearchKind {
    fn from(scope: SearchScope) -> Self {
        match scope {
            SearchScope::All => SearchKind::All,
            SearchScope::Entities => SearchKind::Entities,
            SearchScope::Thoughts => SearchKind::Thoughts,
        }
    }
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Show config file path
    Path,
    /// Write the default configuration file
    Init {
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("thinkgraph=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let format = cli.format;

    match cli.command {
        Commands::Ingest {
            input,
            session_id,
            no_overwrite,
            llm,
        } => {
            let store = open_store(&config, cli.db).await?;
            cmd_ingest(&config, store, &input, session_id.as_deref(), !no_overwrite, llm, format).await
        }

        Commands::Extract { text, file, stats } => cmd_extract(&config, text, file, stats, format),

        Commands::Context { session_id, input } => {
            let store = open_store(&config, cli.db).await?;
            cmd_context(&config, store, &session_id, &input, format).await
        }

        Commands::Prompt { session_id, input } => {
            let store = open_store(&config, cli.db).await?;
            cmd_prompt(&config, store, &session_id, &input, format).await
        }

        Commands::Chat {
            session_id,
            input,
            model,
        } => {
            let store = open_store(&config, cli.db).await?;
            cmd_chat(&config, store, &session_id, &input, model.as_deref(), format).await
        }

        Commands::Sessions { id, limit, delete } => {
            let store = open_store(&config, cli.db).await?;
            match id {
                Some(id) if delete => cmd_delete_session(store, &id, format).await,
                id => cmd_sessions(store, id.as_deref(), limit, format).await,
            }
        }

        Commands::Search { query, kind, limit } => {
            let store = open_store(&config, cli.db).await?;
            cmd_search(store, &query, kind.into(), limit, format).await
        }

        Commands::Node { name, limit } => {
            let store = open_store(&config, cli.db).await?;
            cmd_node(store, &name, limit, format).await
        }

        Commands::Patterns => {
            let store = open_store(&config, cli.db).await?;
            cmd_patterns(&config, store, format).await
        }

        Commands::Stats => {
            let database = open_database(&config, cli.db).await?;
            let store = SqliteGraphStore::new(database.pool().clone());
            let stats = store.stats().await?;
            let schema_version = database.schema_version().await?;

            let value = serde_json::json!({
                "database": database.path(),
                "schema_version": schema_version,
                "graph": &stats,
            });
            emit(format, &value, || {
                if let Some(path) = database.path() {
                    println!("Database:              {}", path.display());
                }
                println!("Schema version:        {}", schema_version);
                println!("Sessions:              {}", stats.sessions);
                println!("Thoughts:              {}", stats.thoughts);
                println!("Entities:              {}", stats.entities);
                println!("Tools:                 {}", stats.tools);
                println!("Mentions:              {}", stats.mentions);
                println!("Reasoning flows:       {}", stats.reasoning_flows);
                println!("Entity relationships:  {}", stats.entity_relationships);
            })
        }

        Commands::Clear { force } => {
            if !force {
                return Err(anyhow!(
                    "Refusing to clear the graph without --force. This deletes every session, thought and entity."
                ));
            }
            let store = open_store(&config, cli.db).await?;
            store.clear().await?;
            info!("Knowledge graph cleared");
            emit(format, &serde_json::json!({ "cleared": true }), || {
                println!("Knowledge graph cleared.")
            })
        }

        Commands::Config { action } => cmd_config(&config, action, format),
    }
}

// ============================================================================
// Setup
// ============================================================================

async fn open_database(config: &Config, db: Option<PathBuf>) -> anyhow::Result<Database> {
    let path = match db {
        Some(path) => path,
        None => config.database_path()?,
    };
    debug!(path = %path.display(), "Opening graph database");

    Database::new(DatabaseConfig::with_path(path)).await
}

async fn open_store(config: &Config, db: Option<PathBuf>) -> anyhow::Result<Arc<SqliteGraphStore>> {
    let database = open_database(config, db).await?;
    Ok(Arc::new(SqliteGraphStore::new(database.pool().clone())))
}

fn extractor(config: &Config) -> anyhow::Result<Arc<EntityExtractor>> {
    Ok(Arc::new(EntityExtractor::new(config.extraction.clone())?))
}

fn llm_client(config: &Config, model: Option<&str>) -> anyhow::Result<Arc<dyn CompletionProvider>> {
    let api_key = config.llm.resolved_api_key()?.ok_or_else(|| {
        anyhow!("No API key found. Set THINKGRAPH_API_KEY or OPENROUTER_API_KEY environment variable.")
    })?;
    let mut builder = LlmClient::builder().config(config.llm.clone()).api_key(api_key);
    if let Some(model) = model {
        builder = builder.model(model);
    }
    Ok(Arc::new(builder.build()?))
}

fn assembler(
    config: &Config,
    store: Arc<SqliteGraphStore>,
) -> anyhow::Result<ContextAssembler<SqliteGraphStore>> {
    Ok(ContextAssembler::with_config(
        store,
        extractor(config)?,
        config.context.clone(),
    )?)
}

fn emit<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce()) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => text(),
    }
    Ok(())
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_ingest(
    config: &Config,
    store: Arc<SqliteGraphStore>,
    input: &str,
    session_id: Option<&str>,
    overwrite: bool,
    use_llm: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let text = if input == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read thinking text from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(input).with_context(|| format!("Failed to read {}", input))?
    };

    let extractor = extractor(config)?;
    let mut analyzer = ThinkingAnalyzer::new(extractor.clone())?;
    if use_llm {
        analyzer = analyzer.with_provider(llm_client(config, None)?);
    }

    let builder = KnowledgeGraphBuilder::new(store.clone(), analyzer, extractor);
    let id = builder.process_thinking(&text, session_id, overwrite).await?;
    let detail = store
        .get_session(&id)
        .await?
        .ok_or_else(|| anyhow!("Session {} was not stored", id))?;

    emit(format, &detail, || {
        println!("Session: {}", id);
        println!("  Strategy: {}", detail.session.reasoning_strategy);
        println!("  Domain:   {}", detail.session.domain);
        println!("  Thoughts: {}", detail.thoughts.len());
    })
}

fn cmd_extract(
    config: &Config,
    text: Option<String>,
    file: Option<PathBuf>,
    stats: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let text = match (text, file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => return Err(anyhow!("Provide TEXT or --file")),
    };

    let extractor = extractor(config)?;
    let result = extractor.extract_entities_with_confidence(&text);
    let statistics = stats.then(|| extractor.entity_statistics(&result));

    let value = serde_json::json!({ "result": &result, "statistics": &statistics });
    emit(format, &value, || {
        print_extraction(&result);
        if let Some(statistics) = &statistics {
            println!("\nStatistics:");
            for (category, count) in &statistics.category_counts {
                match statistics.confidence_distribution.get(category) {
                    Some(d) => println!(
                        "  {:<16} {:>3}  mean {:.2}  min {:.2}  max {:.2}",
                        category, count, d.mean, d.min, d.max
                    ),
                    None => println!("  {:<16} {:>3}", category, count),
                }
            }
        }
    })
}

fn print_extraction(result: &ExtractionResult) {
    if result.is_empty() && result.definitions.is_empty() {
        println!("No entities found.");
        return;
    }

    println!(
        "{} entities, overall confidence {:.2}",
        result.total_entities, result.overall_confidence
    );
    for category in EntityCategory::ALL {
        let entities = result.category(category);
        if entities.is_empty() {
            continue;
        }
        println!("\n{}:", category);
        for entity in entities {
            println!("  {} ({:.2}, {} mentions)", entity.name, entity.confidence, entity.mentions);
        }
    }
    if !result.definitions.is_empty() {
        println!("\nDefinitions:");
        for (term, definition) in &result.definitions {
            println!("  {}: {} ({:.2})", term, definition.definition, definition.confidence);
        }
    }
}

async fn cmd_context(
    config: &Config,
    store: Arc<SqliteGraphStore>,
    session_id: &str,
    input: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let assembler = assembler(config, store)?;
    let context = assembler.get_conversation_context(input, session_id).await;
    let metadata = get_context_metadata(&context);

    let value = serde_json::json!({ "context": &context, "metadata": &metadata });
    emit(format, &value, || print_context(&context))
}

fn print_context(context: &ConversationContext) {
    println!("{}", context.context_summary);
    if !context.extracted_entities.is_empty() {
        println!("\nMentions: {}", context.extracted_entities.join(", "));
    }
    if !context.related_entities.is_empty() {
        println!("\nEntities:");
        for entity in &context.related_entities {
            print!("  {} [{}] {} thoughts", entity.name, entity.entity_types.join(", "), entity.mention_count);
            if let Some(definition) = &entity.definition {
                print!(" - {}", definition);
            }
            println!();
        }
    }
    if !context.related_thoughts.is_empty() {
        println!("\nThoughts:");
        for thought in &context.related_thoughts {
            println!(
                "  ({:.2}) [{}] {} ({})",
                thought.relevance_score, thought.thought_type, thought.content, thought.session_id
            );
        }
    }
    if !context.similar_sessions.is_empty() {
        println!("\nSimilar sessions:");
        for session in &context.similar_sessions {
            println!(
                "  {} - {} about {} ({} shared)",
                session.session_id, session.strategy, session.domain, session.entity_overlap
            );
        }
    }
}

async fn cmd_prompt(
    config: &Config,
    store: Arc<SqliteGraphStore>,
    session_id: &str,
    input: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let assembler = assembler(config, store)?;
    let context = assembler.get_conversation_context(input, session_id).await;
    let prompt = assembler.build_enhanced_prompt(input, &context);

    emit(format, &serde_json::json!({ "prompt": &prompt }), || println!("{}", prompt))
}

async fn cmd_chat(
    config: &Config,
    store: Arc<SqliteGraphStore>,
    session_id: &str,
    input: &str,
    model: Option<&str>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let provider = llm_client(config, model)?;
    let chat = ChatService::new(Arc::new(assembler(config, store)?), provider);
    let reply = chat.respond(input, session_id).await?;

    emit(format, &reply, || {
        println!("{}", reply.response);
        println!("\n[{}] {}", reply.model, reply.context_metadata.context_summary);
    })
}

async fn cmd_sessions(
    store: Arc<SqliteGraphStore>,
    id: Option<&str>,
    limit: usize,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match id {
        Some(id) => {
            let detail = store
                .get_session(id)
                .await?
                .ok_or_else(|| thinkgraph_core::Error::SessionNotFound(id.to_string()))?;
            emit(format, &detail, || {
                println!(
                    "{} - {} about {} ({})",
                    detail.session.id,
                    detail.session.reasoning_strategy,
                    detail.session.domain,
                    detail.session.created_at.format("%Y-%m-%d %H:%M:%S")
                );
                for thought in &detail.thoughts {
                    println!(
                        "  {:>3}. [{}] {} ({:.2})",
                        thought.sequence_order, thought.thought_type, thought.content, thought.confidence
                    );
                }
            })
        }
        None => {
            let sessions = store.list_sessions(limit).await?;
            emit(format, &sessions, || {
                if sessions.is_empty() {
                    println!("No sessions found.");
                    println!("\nIngest one with: thinkgraph ingest <FILE>");
                    return;
                }
                for session in &sessions {
                    println!(
                        "{}  {:<14} {:<12} {:>3} thoughts  {}",
                        session.session_id,
                        session.reasoning_strategy,
                        session.domain,
                        session.thought_count,
                        session.created_at.format("%Y-%m-%d %H:%M")
                    );
                }
            })
        }
    }
}

async fn cmd_delete_session(
    store: Arc<SqliteGraphStore>,
    id: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    if !store.delete_session(id).await? {
        return Err(thinkgraph_core::Error::SessionNotFound(id.to_string()).into());
    }
    emit(format, &serde_json::json!({ "deleted": id }), || {
        println!("Deleted session {}", id)
    })
}

async fn cmd_search(
    store: Arc<SqliteGraphStore>,
    query: &str,
    kind: SearchKind,
    limit: usize,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let hits = store.search(query, kind, limit).await?;

    emit(format, &hits, || {
        if hits.is_empty() {
            println!("No matches for \"{}\".", query.trim());
            return;
        }
        for hit in &hits {
            match hit.kind {
                SearchHitKind::Entity => {
                    println!("[entity] {} ({})", hit.id, hit.label);
                }
                SearchHitKind::Thought => {
                    println!(
                        "[thought] {} [{}] in {}",
                        hit.id,
                        hit.label,
                        hit.session_id.as_deref().unwrap_or("-")
                    );
                }
            }
            if hit.snippet != hit.id {
                println!("    {}", hit.snippet);
            }
        }
    })
}

async fn cmd_node(
    store: Arc<SqliteGraphStore>,
    name: &str,
    limit: usize,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let detail = store
        .node_detail(name)
        .await?
        .ok_or_else(|| anyhow!("Entity not found: {}", name.trim()))?;
    let connections = store.node_connections(&detail.name, limit).await?;
    let timeline = store.node_timeline(&detail.name, limit).await?;

    let value = serde_json::json!({
        "node": &detail,
        "connections": &connections,
        "timeline": &timeline,
    });
    emit(format, &value, || {
        let stats = &detail.statistics;
        println!("{} [{}]", detail.name, detail.entity_type);
        if let Some(definition) = &detail.definition {
            println!("  {}", definition);
        }
        println!(
            "  {} mentions in {} sessions, mean confidence {:.2}, {} connections",
            stats.mention_count, stats.session_count, stats.average_confidence, stats.connection_count
        );

        if !connections.is_empty() {
            println!("\nConnections:");
            for c in &connections {
                println!("  {} [{}] {} x{:.0}", c.name, c.entity_type, c.relationship, c.strength);
            }
        }
        if !timeline.is_empty() {
            println!("\nTimeline:");
            for entry in &timeline {
                println!(
                    "  {} {} - {} about {}",
                    entry.created_at.format("%Y-%m-%d %H:%M"),
                    entry.session_id,
                    entry.reasoning_strategy,
                    entry.domain
                );
                for thought in &entry.thoughts {
                    println!("      [{}] {}", thought.thought_type, thought.content);
                }
            }
        }
    })
}

async fn cmd_patterns(
    config: &Config,
    store: Arc<SqliteGraphStore>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let extractor = extractor(config)?;
    let builder = KnowledgeGraphBuilder::new(store, ThinkingAnalyzer::new(extractor.clone())?, extractor);
    let patterns = builder.analyze_patterns().await?;

    emit(format, &patterns, || {
        println!("Reasoning patterns:");
        for p in &patterns.reasoning_patterns {
            println!("  {} / {}: {}", p.strategy, p.domain, p.frequency);
        }
        println!("\nSuccessful patterns:");
        for p in &patterns.successful_patterns {
            let sequence: Vec<&str> = p.thought_sequence.iter().map(|t| t.as_str()).collect();
            println!("  {} [{}] x{}", p.strategy, sequence.join(" -> "), p.frequency);
        }
        println!("\nTool usage:");
        for p in &patterns.tool_usage_patterns {
            let types: Vec<&str> = p.thought_types.iter().map(|t| t.as_str()).collect();
            println!("  {}: {} uses ({})", p.tool_name, p.usage_count, types.join(", "));
        }
    })
}

fn cmd_config(config: &Config, action: ConfigAction, format: OutputFormat) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let api_key = config
                .llm
                .redacted_api_key()?
                .unwrap_or_else(|| "(not set - use THINKGRAPH_API_KEY or OPENROUTER_API_KEY env var)".to_string());
            emit(format, config, || {
                match toml::to_string_pretty(config) {
                    Ok(rendered) => print!("{}", rendered),
                    Err(e) => eprintln!("Failed to render configuration: {}", e),
                }
                println!("\n# llm.api_key = {}", api_key);
            })
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            emit(format, &serde_json::json!({ "path": &path }), || {
                println!("{}", path.display())
            })
        }
        ConfigAction::Init { force } => {
            let path = Config::config_path()?;
            if path.exists() && !force {
                return Err(anyhow!(
                    "Configuration already exists at {}. Use --force to overwrite.",
                    path.display()
                ));
            }
            let path = Config::default().save()?;
            emit(format, &serde_json::json!({ "path": &path }), || {
                println!("Wrote default configuration to {}", path.display())
            })
        }
    }
}
