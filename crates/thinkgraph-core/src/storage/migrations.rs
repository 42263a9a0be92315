//! Database migrations
//!
//! Schema versions are applied in order on connection and tracked in `_migrations`.

use sqlx::SqlitePool;

/// Current schema version
pub const CURRENT_VERSION: i32 = 1;

/// SQL for creating the migrations tracking table
const CREATE_MIGRATIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS _migrations (
        version INTEGER PRIMARY KEY NOT NULL,
        applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
"#;

/// Migration 1: Knowledge graph schema
///
/// Timestamps are RFC 3339 UTC strings with fixed microsecond precision, so
/// lexical order is chronological order.
const MIGRATION_V1: &str = r#"
    -- Thinking sessions
    CREATE TABLE IF NOT EXISTS sessions (
        id TEXT PRIMARY KEY NOT NULL,
        raw_text TEXT NOT NULL DEFAULT '',
        reasoning_strategy TEXT NOT NULL DEFAULT 'sequential',
        domain TEXT NOT NULL DEFAULT 'general',
        success_indicators TEXT NOT NULL DEFAULT '[]',
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_sessions_created_at ON sessions(created_at);

    -- Thoughts (session CONTAINS thought)
    CREATE TABLE IF NOT EXISTS thoughts (
        id TEXT PRIMARY KEY NOT NULL,
        session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
        content TEXT NOT NULL,
        thought_type TEXT NOT NULL DEFAULT 'reflection'
            CHECK (thought_type IN ('observation', 'analysis', 'decision', 'action', 'reflection')),
        confidence REAL NOT NULL DEFAULT 0.5,
        sequence_order INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_thoughts_session ON thoughts(session_id, created_at);

    -- Entities, unique by name ignoring ASCII case; the first casing stored is kept
    CREATE TABLE IF NOT EXISTS entities (
        name TEXT PRIMARY KEY NOT NULL COLLATE NOCASE,
        entity_type TEXT NOT NULL DEFAULT 'Entity',
        definition TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_entities_name_lower ON entities(lower(name));

    -- Thought MENTIONS entity
    CREATE TABLE IF NOT EXISTS thought_mentions (
        thought_id TEXT NOT NULL REFERENCES thoughts(id) ON DELETE CASCADE,
        entity_name TEXT NOT NULL COLLATE NOCASE REFERENCES entities(name) ON DELETE CASCADE,
        PRIMARY KEY (thought_id, entity_name)
    );

    CREATE INDEX IF NOT EXISTS idx_thought_mentions_entity ON thought_mentions(entity_name);

    -- Tools and thought USES_TOOL tool
    CREATE TABLE IF NOT EXISTS tools (
        name TEXT PRIMARY KEY NOT NULL COLLATE NOCASE,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS thought_tools (
        thought_id TEXT NOT NULL REFERENCES thoughts(id) ON DELETE CASCADE,
        tool_name TEXT NOT NULL COLLATE NOCASE REFERENCES tools(name) ON DELETE CASCADE,
        PRIMARY KEY (thought_id, tool_name)
    );

    CREATE INDEX IF NOT EXISTS idx_thought_tools_tool ON thought_tools(tool_name);

    -- Thought REASONING_FLOW thought
    CREATE TABLE IF NOT EXISTS reasoning_flows (
        source_id TEXT NOT NULL REFERENCES thoughts(id) ON DELETE CASCADE,
        target_id TEXT NOT NULL REFERENCES thoughts(id) ON DELETE CASCADE,
        flow_type TEXT NOT NULL DEFAULT 'leads_to'
            CHECK (flow_type IN ('leads_to', 'depends_on', 'supports', 'contradicts')),
        strength REAL NOT NULL DEFAULT 0.5,
        PRIMARY KEY (source_id, target_id, flow_type)
    );

    CREATE INDEX IF NOT EXISTS idx_reasoning_flows_target ON reasoning_flows(target_id);

    -- Entity co-occurrence relationships
    CREATE TABLE IF NOT EXISTS entity_relationships (
        source_name TEXT NOT NULL COLLATE NOCASE REFERENCES entities(name) ON DELETE CASCADE,
        target_name TEXT NOT NULL COLLATE NOCASE REFERENCES entities(name) ON DELETE CASCADE,
        relationship_type TEXT NOT NULL DEFAULT 'RELATED_TO',
        weight REAL NOT NULL DEFAULT 1.0,
        PRIMARY KEY (source_name, target_name, relationship_type),
        CHECK (source_name <> target_name)
    );

    CREATE INDEX IF NOT EXISTS idx_entity_relationships_target ON entity_relationships(target_name);
"#;

/// Get the current schema version from the database
async fn get_current_version(pool: &SqlitePool) -> anyhow::Result<i32> {
    sqlx::raw_sql(CREATE_MIGRATIONS_TABLE).execute(pool).await?;

    let row: Option<(Option<i32>,)> = sqlx::query_as("SELECT MAX(version) FROM _migrations")
        .fetch_optional(pool)
        .await?;

    Ok(row.and_then(|(v,)| v).unwrap_or(0))
}

/// Record that a migration has been applied
async fn record_migration(pool: &SqlitePool, version: i32) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO _migrations (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    let current_version = get_current_version(pool).await?;

    tracing::info!(
        current_version = current_version,
        target_version = CURRENT_VERSION,
        "Checking database migrations"
    );

    if current_version >= CURRENT_VERSION {
        tracing::debug!("Database is up to date");
        return Ok(());
    }

    if current_version < 1 {
        tracing::info!("Applying migration v1: Knowledge graph schema");
        sqlx::raw_sql(MIGRATION_V1).execute(pool).await?;
        record_migration(pool, 1).await?;
    }

    tracing::info!("Database migrations completed");
    Ok(())
}

/// Get migration status information
pub async fn migration_status(pool: &SqlitePool) -> anyhow::Result<MigrationStatus> {
    let current_version = get_current_version(pool).await?;
    Ok(MigrationStatus {
        current_version,
        target_version: CURRENT_VERSION,
        needs_migration: current_version < CURRENT_VERSION,
    })
}

/// Migration status information
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    /// Current schema version in the database
    pub current_version: i32,
    /// Target schema version (latest)
    pub target_version: i32,
    /// Whether migrations need to be run
    pub needs_migration: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test pool")
    }

    #[tokio::test]
    async fn test_run_migrations() {
        let pool = create_test_pool().await;

        let status = migration_status(&pool).await.unwrap();
        assert_eq!(status.current_version, 0);
        assert!(status.needs_migration);

        run_migrations(&pool).await.unwrap();

        let status = migration_status(&pool).await.unwrap();
        assert_eq!(status.current_version, CURRENT_VERSION);
        assert!(!status.needs_migration);
    }

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let pool = create_test_pool().await;

        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let status = migration_status(&pool).await.unwrap();
        assert_eq!(status.current_version, CURRENT_VERSION);
    }

    #[tokio::test]
    async fn test_tables_created() {
        let pool = create_test_pool().await;
        run_migrations(&pool).await.unwrap();

        let tables = [
            "sessions",
            "thoughts",
            "entities",
            "thought_mentions",
            "tools",
            "thought_tools",
            "reasoning_flows",
            "entity_relationships",
        ];

        for table in tables {
            let result: (i32,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(&pool)
                .await
                .unwrap_or_else(|_| panic!("Table {} should exist", table));
            assert_eq!(result.0, 0, "Table {} should be empty", table);
        }
    }

    #[tokio::test]
    async fn test_entity_names_ignore_case() {
        let pool = create_test_pool().await;
        run_migrations(&pool).await.unwrap();

        let insert = "INSERT INTO entities (name, created_at, updated_at) VALUES (?, 'now', 'now')";
        sqlx::query(insert).bind("Python").execute(&pool).await.unwrap();
        let duplicate = sqlx::query(insert).bind("python").execute(&pool).await;
        assert!(duplicate.is_err(), "case variants must collide on the entity key");

        let (name,): (String,) = sqlx::query_as("SELECT name FROM entities WHERE name = 'PYTHON'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(name, "Python");
    }
}
