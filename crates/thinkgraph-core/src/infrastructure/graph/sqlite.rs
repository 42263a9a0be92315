//! SQLite implementation of the graph store traits
//!
//! Nodes and edges are plain tables (see `storage::migrations`). Entity and
//! tool names are `COLLATE NOCASE` keys, so case variants share one node; every
//! read carries a `LIMIT`. A session and everything hanging off it is written
//! in a single transaction.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::domain::graph::{
    EntityContextRecord, EntityNode, GraphStats, GraphStore, GraphWriter, NodeConnection,
    NodeDetail, NodeStatistics, NodeTimelineEntry, ReasoningEdge, ReasoningPattern,
    RelatedEntityRecord, SearchHit, SearchHitKind, SearchKind, SessionDetail, SessionGraph,
    SessionSummary, SessionThoughtRecord, SimilarSessionRecord, SuccessfulPattern, ThinkingSession,
    Thought, ThoughtRecord, ThoughtType, ToolUsagePattern,
};
use crate::error::{Error, Result};

/// Upper bound on entity names returned per thought
const MAX_MENTIONS_PER_THOUGHT: i64 = 50;

/// Upper bound on thoughts returned for one session
const MAX_SESSION_THOUGHTS: i64 = 1000;

/// Upper bound on sessions scanned for successful patterns
const MAX_PATTERN_SESSIONS: i64 = 500;

/// Thought types listed per tool
const MAX_TOOL_THOUGHT_TYPES: i64 = 5;

/// Upper bound on hits of one search
const MAX_SEARCH_RESULTS: usize = 100;

/// Mentioning thoughts listed per timeline session
const MAX_TIMELINE_THOUGHTS: i64 = 20;

/// Snippet length and the context kept before a match
const SNIPPET_CHARS: usize = 120;
const SNIPPET_LEAD: usize = 40;

/// SQLite-backed knowledge graph
#[derive(Clone)]
pub struct SqliteGraphStore {
    pool: SqlitePool,
}

impl SqliteGraphStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn thought_entities(&self, thought_id: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT entity_name FROM thought_mentions WHERE thought_id = ? ORDER BY entity_name LIMIT ?",
        )
        .bind(thought_id)
        .bind(MAX_MENTIONS_PER_THOUGHT)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn related_thoughts(&self, entity_name: &str, limit: usize) -> Result<Vec<ThoughtRecord>> {
        let rows: Vec<ThoughtRow> = sqlx::query_as(
            r#"
            SELECT t.id, t.content, t.thought_type, t.confidence, t.created_at, t.session_id
            FROM thought_mentions m
            JOIN thoughts t ON t.id = m.thought_id
            WHERE m.entity_name = ?
            ORDER BY t.created_at DESC, t.sequence_order DESC
            LIMIT ?
            "#,
        )
        .bind(entity_name)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ThoughtRow::into_record).collect())
    }

    async fn connection_rows(&self, entity_name: &str, limit: usize) -> Result<Vec<ConnectionRow>> {
        let rows = sqlx::query_as(
            r#"
            SELECT e.name, e.entity_type, r.relationship_type, r.weight
            FROM (
                SELECT target_name AS other, relationship_type, weight
                FROM entity_relationships WHERE source_name = ?
                UNION ALL
                SELECT source_name AS other, relationship_type, weight
                FROM entity_relationships WHERE target_name = ?
            ) r
            JOIN entities e ON e.name = r.other
            ORDER BY r.weight DESC, e.name
            LIMIT ?
            "#,
        )
        .bind(entity_name)
        .bind(entity_name)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl GraphStore for SqliteGraphStore {
    async fn entity_context(
        &self,
        names: &[String],
        thoughts_per_entity: usize,
        related_per_entity: usize,
        limit: usize,
    ) -> Result<Vec<EntityContextRecord>> {
        let keys = lowered_unique(names);
        if keys.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT e.name, e.entity_type, e.definition,
                   (SELECT COUNT(*) FROM thought_mentions m WHERE m.entity_name = e.name) AS thought_count
            FROM entities e
            WHERE lower(e.name) IN ({})
            ORDER BY thought_count DESC, e.name
            LIMIT ?
            "#,
            placeholders(keys.len())
        );

        let mut query = sqlx::query_as::<_, EntityContextRow>(&sql);
        for key in &keys {
            query = query.bind(key);
        }
        let rows = query.bind(limit as i64).fetch_all(&self.pool).await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let related_thoughts = self.related_thoughts(&row.name, thoughts_per_entity).await?;
            let related_entities = self
                .connection_rows(&row.name, related_per_entity)
                .await?
                .into_iter()
                .map(|c| RelatedEntityRecord {
                    name: c.name,
                    entity_type: c.entity_type,
                    relationship: c.relationship_type,
                })
                .collect();

            let mut labels = vec![EntityNode::UNTYPED.to_string()];
            if row.entity_type != EntityNode::UNTYPED {
                labels.push(row.entity_type.clone());
            }

            records.push(EntityContextRecord {
                name: row.name,
                labels,
                definition: row.definition,
                thought_count: row.thought_count.max(0) as u32,
                related_thoughts,
                related_entities,
            });
        }

        debug!(requested = keys.len(), found = records.len(), "Entity context loaded");
        Ok(records)
    }

    async fn session_thoughts(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<SessionThoughtRecord>> {
        let rows: Vec<ThoughtRow> = sqlx::query_as(
            r#"
            SELECT id, content, thought_type, confidence, created_at, session_id
            FROM thoughts
            WHERE session_id = ?
            ORDER BY created_at DESC, sequence_order DESC
            LIMIT ?
            "#,
        )
        .bind(session_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let entities = self.thought_entities(&row.id).await?;
            records.push(SessionThoughtRecord {
                thought: row.into_record(),
                entities,
            });
        }
        Ok(records)
    }

    async fn similar_sessions(
        &self,
        names: &[String],
        exclude_session_id: &str,
        limit: usize,
        sample_size: usize,
    ) -> Result<Vec<SimilarSessionRecord>> {
        let keys = lowered_unique(names);
        if keys.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT s.id, s.reasoning_strategy, s.domain, s.created_at,
                   COUNT(DISTINCT lower(m.entity_name)) AS shared_entities
            FROM sessions s
            JOIN thoughts t ON t.session_id = s.id
            JOIN thought_mentions m ON m.thought_id = t.id
            WHERE lower(m.entity_name) IN ({}) AND s.id <> ?
            GROUP BY s.id
            ORDER BY shared_entities DESC, s.created_at DESC
            LIMIT ?
            "#,
            placeholders(keys.len())
        );

        let mut query = sqlx::query_as::<_, SimilarSessionRow>(&sql);
        for key in &keys {
            query = query.bind(key);
        }
        let rows = query
            .bind(exclude_session_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        let sample_sql = format!(
            r#"
            SELECT t.content
            FROM thoughts t
            JOIN thought_mentions m ON m.thought_id = t.id
            WHERE t.session_id = ? AND lower(m.entity_name) IN ({})
            GROUP BY t.content
            ORDER BY MIN(t.sequence_order)
            LIMIT ?
            "#,
            placeholders(keys.len())
        );

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let mut sample_query = sqlx::query_as::<_, (String,)>(&sample_sql).bind(&row.id);
            for key in &keys {
                sample_query = sample_query.bind(key);
            }
            let samples = sample_query
                .bind(sample_size as i64)
                .fetch_all(&self.pool)
                .await?;

            records.push(SimilarSessionRecord {
                session_id: row.id,
                reasoning_strategy: row.reasoning_strategy,
                domain: row.domain,
                shared_entities: row.shared_entities.max(0) as u32,
                sample_thoughts: samples.into_iter().map(|(c,)| c).collect(),
                created_at: parse_db_time(&row.created_at),
            });
        }
        Ok(records)
    }
}

#[async_trait]
impl GraphWriter for SqliteGraphStore {
    // ========== Session Operations ==========

    async fn session_exists(&self, session_id: &str) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        session_row_exists(&mut conn, session_id).await
    }

    async fn write_session(&self, graph: &SessionGraph, overwrite: bool) -> Result<bool> {
        let session_id = graph.session.id.as_str();
        let mut tx = self.pool.begin().await?;

        if session_row_exists(&mut tx, session_id).await? {
            if !overwrite {
                // Dropping the transaction rolls it back
                debug!(session_id = %session_id, "Session exists, write skipped");
                return Ok(false);
            }
            delete_session_rows(&mut tx, session_id).await?;
            debug!(session_id = %session_id, "Replacing existing session");
        }

        insert_session(&mut tx, &graph.session).await?;
        for links in &graph.thoughts {
            insert_thought(&mut tx, &links.thought).await?;
            for entity in &links.entities {
                link_mention(&mut tx, &links.thought.id, entity).await?;
            }
            for tool in &links.tools {
                link_tool(&mut tx, &links.thought.id, tool).await?;
            }
        }
        for link in &graph.entity_links {
            relate_entities(&mut tx, &link.source, &link.target, &link.relationship).await?;
        }
        for edge in &graph.edges {
            insert_edge(&mut tx, edge).await?;
        }
        for entity in &graph.entities {
            upsert_entity(&mut tx, entity).await?;
        }

        tx.commit().await?;

        debug!(
            session_id = %session_id,
            thoughts = graph.thoughts.len(),
            edges = graph.edges.len(),
            entities = graph.entities.len(),
            "Session graph written"
        );
        Ok(true)
    }

    async fn delete_session(&self, session_id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let deleted = delete_session_rows(&mut tx, session_id).await? > 0;
        tx.commit().await?;

        if deleted {
            info!(session_id = %session_id, "Session deleted");
        }
        Ok(deleted)
    }

    async fn list_sessions(&self, limit: usize) -> Result<Vec<SessionSummary>> {
        let rows: Vec<SessionSummaryRow> = sqlx::query_as(
            r#"
            SELECT s.id, s.reasoning_strategy, s.domain, s.created_at, COUNT(t.id) AS thought_count
            FROM sessions s
            LEFT JOIN thoughts t ON t.session_id = s.id
            GROUP BY s.id
            ORDER BY s.created_at DESC, s.id
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| SessionSummary {
                session_id: r.id,
                reasoning_strategy: r.reasoning_strategy,
                domain: r.domain,
                thought_count: r.thought_count.max(0) as u32,
                created_at: parse_db_time(&r.created_at),
            })
            .collect())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionDetail>> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT id, raw_text, reasoning_strategy, domain, success_indicators, created_at FROM sessions WHERE id = ?",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let thoughts: Vec<FullThoughtRow> = sqlx::query_as(
            r#"
            SELECT id, session_id, content, thought_type, confidence, sequence_order, created_at
            FROM thoughts
            WHERE session_id = ?
            ORDER BY sequence_order
            LIMIT ?
            "#,
        )
        .bind(session_id)
        .bind(MAX_SESSION_THOUGHTS)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(SessionDetail {
            session: row.into_session(),
            thoughts: thoughts.into_iter().map(FullThoughtRow::into_thought).collect(),
        }))
    }

    // ========== Search and Node Details ==========

    async fn search(&self, query: &str, kind: SearchKind, limit: usize) -> Result<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("search query must not be empty".to_string()));
        }
        let limit = limit.min(MAX_SEARCH_RESULTS);
        let pattern = like_pattern(query);
        let mut hits = Vec::new();

        if kind.includes_entities() && limit > 0 {
            let rows: Vec<(String, String, Option<String>)> = sqlx::query_as(
                r#"
                SELECT name, entity_type, definition
                FROM entities
                WHERE name LIKE ? ESCAPE '\' OR definition LIKE ? ESCAPE '\'
                ORDER BY
                    CASE WHEN name = ? THEN 0 WHEN name LIKE ? ESCAPE '\' THEN 1 ELSE 2 END,
                    name
                LIMIT ?
                "#,
            )
            .bind(&pattern)
            .bind(&pattern)
            .bind(query)
            .bind(&pattern)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

            hits.extend(rows.into_iter().map(|(name, entity_type, definition)| SearchHit {
                kind: SearchHitKind::Entity,
                snippet: definition
                    .as_deref()
                    .map(|d| snippet(d, query))
                    .unwrap_or_else(|| name.clone()),
                id: name,
                label: entity_type,
                session_id: None,
            }));
        }

        let remaining = limit - hits.len();
        if kind.includes_thoughts() && remaining > 0 {
            let rows: Vec<(String, String, String, String)> = sqlx::query_as(
                r#"
                SELECT id, session_id, content, thought_type
                FROM thoughts
                WHERE content LIKE ? ESCAPE '\'
                ORDER BY created_at DESC, sequence_order DESC
                LIMIT ?
                "#,
            )
            .bind(&pattern)
            .bind(remaining as i64)
            .fetch_all(&self.pool)
            .await?;

            hits.extend(rows.into_iter().map(|(id, session_id, content, thought_type)| SearchHit {
                kind: SearchHitKind::Thought,
                id,
                label: thought_type,
                snippet: snippet(&content, query),
                session_id: Some(session_id),
            }));
        }

        debug!(query = %query, hits = hits.len(), "Graph searched");
        Ok(hits)
    }

    async fn node_detail(&self, name: &str) -> Result<Option<NodeDetail>> {
        let row: Option<EntityRow> = sqlx::query_as(
            "SELECT name, entity_type, definition, created_at, updated_at FROM entities WHERE name = ?",
        )
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let (mention_count, session_count, average_confidence): (i64, i64, Option<f64>) =
            sqlx::query_as(
                r#"
                SELECT COUNT(*), COUNT(DISTINCT t.session_id), AVG(t.confidence)
                FROM thought_mentions m
                JOIN thoughts t ON t.id = m.thought_id
                WHERE m.entity_name = ?
                "#,
            )
            .bind(&row.name)
            .fetch_one(&self.pool)
            .await?;

        let relationships: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT relationship_type, COUNT(*)
            FROM entity_relationships
            WHERE source_name = ? OR target_name = ?
            GROUP BY relationship_type
            "#,
        )
        .bind(&row.name)
        .bind(&row.name)
        .fetch_all(&self.pool)
        .await?;

        let relationship_types: BTreeMap<String, u32> = relationships
            .into_iter()
            .map(|(kind, count)| (kind, count.max(0) as u32))
            .collect();

        Ok(Some(NodeDetail {
            statistics: NodeStatistics {
                connection_count: relationship_types.values().sum(),
                mention_count: mention_count.max(0) as u32,
                session_count: session_count.max(0) as u32,
                average_confidence: average_confidence.unwrap_or(0.0),
                relationship_types,
            },
            name: row.name,
            entity_type: row.entity_type,
            definition: row.definition,
            created_at: parse_db_time(&row.created_at),
            updated_at: parse_db_time(&row.updated_at),
        }))
    }

    async fn node_connections(&self, name: &str, limit: usize) -> Result<Vec<NodeConnection>> {
        Ok(self
            .connection_rows(name.trim(), limit)
            .await?
            .into_iter()
            .map(|c| NodeConnection {
                name: c.name,
                entity_type: c.entity_type,
                relationship: c.relationship_type,
                strength: c.weight,
            })
            .collect())
    }

    async fn node_timeline(&self, name: &str, limit: usize) -> Result<Vec<NodeTimelineEntry>> {
        let name = name.trim();
        let sessions: Vec<SessionHeaderRow> = sqlx::query_as(
            r#"
            SELECT s.id, s.reasoning_strategy, s.domain, s.created_at
            FROM sessions s
            WHERE s.id IN (
                SELECT t.session_id
                FROM thoughts t
                JOIN thought_mentions m ON m.thought_id = t.id
                WHERE m.entity_name = ?
            )
            ORDER BY s.created_at DESC, s.id
            LIMIT ?
            "#,
        )
        .bind(name)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut timeline = Vec::with_capacity(sessions.len());
        for session in sessions {
            let thoughts: Vec<ThoughtRow> = sqlx::query_as(
                r#"
                SELECT t.id, t.content, t.thought_type, t.confidence, t.created_at, t.session_id
                FROM thoughts t
                JOIN thought_mentions m ON m.thought_id = t.id
                WHERE t.session_id = ? AND m.entity_name = ?
                ORDER BY t.sequence_order
                LIMIT ?
                "#,
            )
            .bind(&session.id)
            .bind(name)
            .bind(MAX_TIMELINE_THOUGHTS)
            .fetch_all(&self.pool)
            .await?;

            timeline.push(NodeTimelineEntry {
                session_id: session.id,
                reasoning_strategy: session.reasoning_strategy,
                domain: session.domain,
                created_at: parse_db_time(&session.created_at),
                thoughts: thoughts.into_iter().map(ThoughtRow::into_record).collect(),
            });
        }
        Ok(timeline)
    }

    // ========== Analytics ==========

    async fn reasoning_patterns(&self, limit: usize) -> Result<Vec<ReasoningPattern>> {
        let rows: Vec<(String, String, i64)> = sqlx::query_as(
            r#"
            SELECT reasoning_strategy, domain, COUNT(*) AS frequency
            FROM sessions
            GROUP BY reasoning_strategy, domain
            ORDER BY frequency DESC, reasoning_strategy, domain
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(strategy, domain, frequency)| ReasoningPattern {
                strategy,
                domain,
                frequency: frequency.max(0) as u32,
            })
            .collect())
    }

    async fn successful_patterns(&self, limit: usize) -> Result<Vec<SuccessfulPattern>> {
        let sessions: Vec<(String, String, String)> = sqlx::query_as(
            r#"
            SELECT id, reasoning_strategy, success_indicators
            FROM sessions
            WHERE success_indicators <> '[]'
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(MAX_PATTERN_SESSIONS)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: BTreeMap<(String, Vec<String>, Vec<String>), u32> = BTreeMap::new();
        for (id, strategy, indicators_json) in sessions {
            let indicators: Vec<String> = serde_json::from_str(&indicators_json).unwrap_or_default();
            if indicators.is_empty() {
                continue;
            }

            let types: Vec<(String,)> = sqlx::query_as(
                "SELECT thought_type FROM thoughts WHERE session_id = ? ORDER BY sequence_order LIMIT ?",
            )
            .bind(&id)
            .bind(MAX_SESSION_THOUGHTS)
            .fetch_all(&self.pool)
            .await?;
            if types.is_empty() {
                continue;
            }

            let sequence = types.into_iter().map(|(t,)| t).collect();
            *grouped.entry((strategy, sequence, indicators)).or_insert(0) += 1;
        }

        let mut patterns: Vec<SuccessfulPattern> = grouped
            .into_iter()
            .map(|((strategy, sequence, indicators), frequency)| SuccessfulPattern {
                strategy,
                thought_sequence: sequence.iter().map(|t| ThoughtType::parse_lossy(t)).collect(),
                indicators,
                frequency,
            })
            .collect();
        patterns.sort_by(|a, b| b.frequency.cmp(&a.frequency));
        patterns.truncate(limit);
        Ok(patterns)
    }

    async fn tool_usage_patterns(&self, limit: usize) -> Result<Vec<ToolUsagePattern>> {
        let tools: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT tool_name, COUNT(*) AS usage_count
            FROM thought_tools
            GROUP BY tool_name
            ORDER BY usage_count DESC, tool_name
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut patterns = Vec::with_capacity(tools.len());
        for (tool_name, usage_count) in tools {
            let types: Vec<(String,)> = sqlx::query_as(
                r#"
                SELECT t.thought_type
                FROM thought_tools tt
                JOIN thoughts t ON t.id = tt.thought_id
                WHERE tt.tool_name = ?
                GROUP BY t.thought_type
                ORDER BY COUNT(*) DESC, t.thought_type
                LIMIT ?
                "#,
            )
            .bind(&tool_name)
            .bind(MAX_TOOL_THOUGHT_TYPES)
            .fetch_all(&self.pool)
            .await?;

            patterns.push(ToolUsagePattern {
                tool_name,
                thought_types: types.iter().map(|(t,)| ThoughtType::parse_lossy(t)).collect(),
                usage_count: usage_count.max(0) as u32,
            });
        }
        Ok(patterns)
    }

    async fn stats(&self) -> Result<GraphStats> {
        let row: (i64, i64, i64, i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM sessions),
                (SELECT COUNT(*) FROM thoughts),
                (SELECT COUNT(*) FROM entities),
                (SELECT COUNT(*) FROM tools),
                (SELECT COUNT(*) FROM thought_mentions),
                (SELECT COUNT(*) FROM reasoning_flows),
                (SELECT COUNT(*) FROM entity_relationships)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(GraphStats {
            sessions: row.0 as u64,
            thoughts: row.1 as u64,
            entities: row.2 as u64,
            tools: row.3 as u64,
            mentions: row.4 as u64,
            reasoning_flows: row.5 as u64,
            entity_relationships: row.6 as u64,
        })
    }

    async fn clear(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for table in [
            "thought_mentions",
            "thought_tools",
            "reasoning_flows",
            "entity_relationships",
            "thoughts",
            "sessions",
            "entities",
            "tools",
        ] {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        info!("Knowledge graph cleared");
        Ok(())
    }
}

// ========== Statements ==========
//
// Single writes over one connection, composed into transactions above.

type Conn = SqliteConnection;

async fn session_row_exists(conn: &mut Conn, session_id: &str) -> Result<bool> {
    let row: Option<(String,)> = sqlx::query_as("SELECT id FROM sessions WHERE id = ? LIMIT 1")
        .bind(session_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.is_some())
}

/// Removes a session, its thoughts and their edges; returns sessions deleted
async fn delete_session_rows(conn: &mut Conn, session_id: &str) -> Result<u64> {
    sqlx::query(
        "DELETE FROM thought_mentions WHERE thought_id IN (SELECT id FROM thoughts WHERE session_id = ?)",
    )
    .bind(session_id)
    .execute(&mut *conn)
    .await?;
    sqlx::query(
        "DELETE FROM thought_tools WHERE thought_id IN (SELECT id FROM thoughts WHERE session_id = ?)",
    )
    .bind(session_id)
    .execute(&mut *conn)
    .await?;
    sqlx::query(
        r#"
        DELETE FROM reasoning_flows
        WHERE source_id IN (SELECT id FROM thoughts WHERE session_id = ?)
           OR target_id IN (SELECT id FROM thoughts WHERE session_id = ?)
        "#,
    )
    .bind(session_id)
    .bind(session_id)
    .execute(&mut *conn)
    .await?;
    sqlx::query("DELETE FROM thoughts WHERE session_id = ?")
        .bind(session_id)
        .execute(&mut *conn)
        .await?;
    let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(session_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

async fn insert_session(conn: &mut Conn, session: &ThinkingSession) -> Result<()> {
    let indicators = serde_json::to_string(&session.success_indicators)
        .map_err(|e| Error::Other(format!("Failed to serialize success indicators: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO sessions (id, raw_text, reasoning_strategy, domain, success_indicators, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&session.id)
    .bind(&session.raw_text)
    .bind(&session.reasoning_strategy)
    .bind(&session.domain)
    .bind(&indicators)
    .bind(db_time(&session.created_at))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_thought(conn: &mut Conn, thought: &Thought) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO thoughts (id, session_id, content, thought_type, confidence, sequence_order, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&thought.id)
    .bind(&thought.session_id)
    .bind(&thought.content)
    .bind(thought.thought_type.as_str())
    .bind(thought.confidence)
    .bind(thought.sequence_order as i64)
    .bind(db_time(&thought.created_at))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Untyped entity unless one with the same name exists in any casing
async fn ensure_entity(conn: &mut Conn, name: &str) -> Result<()> {
    let now = db_time(&Utc::now());
    sqlx::query(
        "INSERT OR IGNORE INTO entities (name, entity_type, created_at, updated_at) VALUES (?, 'Entity', ?, ?)",
    )
    .bind(name)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Mentions reference the stored casing of the entity name
async fn link_mention(conn: &mut Conn, thought_id: &str, entity_name: &str) -> Result<()> {
    ensure_entity(conn, entity_name).await?;
    sqlx::query(
        "INSERT OR IGNORE INTO thought_mentions (thought_id, entity_name) SELECT ?, name FROM entities WHERE name = ?",
    )
    .bind(thought_id)
    .bind(entity_name)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn link_tool(conn: &mut Conn, thought_id: &str, tool_name: &str) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO tools (name, created_at) VALUES (?, ?)")
        .bind(tool_name)
        .bind(db_time(&Utc::now()))
        .execute(&mut *conn)
        .await?;
    sqlx::query(
        "INSERT OR IGNORE INTO thought_tools (thought_id, tool_name) SELECT ?, name FROM tools WHERE name = ?",
    )
    .bind(thought_id)
    .bind(tool_name)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_edge(conn: &mut Conn, edge: &ReasoningEdge) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO reasoning_flows (source_id, target_id, flow_type, strength)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(source_id, target_id, flow_type) DO UPDATE SET
            strength = excluded.strength
        "#,
    )
    .bind(&edge.source_id)
    .bind(&edge.target_id)
    .bind(edge.flow_type.as_str())
    .bind(edge.strength)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// A typed label replaces `Entity`, and an existing definition is never cleared
async fn upsert_entity(conn: &mut Conn, entity: &EntityNode) -> Result<()> {
    let now = db_time(&Utc::now());
    sqlx::query(
        r#"
        INSERT INTO entities (name, entity_type, definition, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(name) DO UPDATE SET
            entity_type = CASE
                WHEN excluded.entity_type = 'Entity' THEN entities.entity_type
                ELSE excluded.entity_type
            END,
            definition = COALESCE(excluded.definition, entities.definition),
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&entity.name)
    .bind(&entity.entity_type)
    .bind(&entity.definition)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Strengthen an undirected relationship, stored once per pair
async fn relate_entities(conn: &mut Conn, source: &str, target: &str, relationship: &str) -> Result<()> {
    if source.eq_ignore_ascii_case(target) {
        return Ok(());
    }
    // Same order NOCASE keys compare in
    let (first, second) = if source.to_ascii_lowercase() < target.to_ascii_lowercase() {
        (source, target)
    } else {
        (target, source)
    };

    ensure_entity(conn, first).await?;
    ensure_entity(conn, second).await?;

    sqlx::query(
        r#"
        INSERT INTO entity_relationships (source_name, target_name, relationship_type, weight)
        SELECT a.name, b.name, ?, 1.0
        FROM entities a, entities b
        WHERE a.name = ? AND b.name = ?
        ON CONFLICT(source_name, target_name, relationship_type) DO UPDATE SET
            weight = entity_relationships.weight + 1.0
        "#,
    )
    .bind(relationship)
    .bind(first)
    .bind(second)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// ========== Helpers ==========

/// Fixed-width UTC timestamp so that text order is time order
fn db_time(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_db_time(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

/// `%query%` with LIKE wildcards in the query escaped by a backslash
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Up to `SNIPPET_CHARS` characters of `text` around the first
/// case-insensitive occurrence of `query`, with `...` where text was cut
fn snippet(text: &str, query: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= SNIPPET_CHARS {
        return text.to_string();
    }

    let needle: Vec<char> = query.chars().collect();
    let start = find_ignore_case(&chars, &needle)
        .map(|at| at.saturating_sub(SNIPPET_LEAD))
        .unwrap_or(0)
        .min(chars.len() - SNIPPET_CHARS);
    let end = start + SNIPPET_CHARS;

    let mut out = String::with_capacity(SNIPPET_CHARS + 6);
    if start > 0 {
        out.push_str("...");
    }
    out.extend(&chars[start..end]);
    if end < chars.len() {
        out.push_str("...");
    }
    out
}

fn find_ignore_case(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).find(|&start| {
        haystack[start..start + needle.len()]
            .iter()
            .zip(needle)
            .all(|(a, b)| a.to_lowercase().eq(b.to_lowercase()))
    })
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Lower-cased names with duplicates and blanks removed, first occurrence order
fn lowered_unique(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(|n| n.trim().to_lowercase())
        .filter(|n| !n.is_empty() && seen.insert(n.clone()))
        .collect()
}

// ========== Row Types ==========

#[derive(FromRow)]
struct ThoughtRow {
    id: String,
    content: String,
    thought_type: String,
    confidence: f64,
    created_at: String,
    session_id: String,
}

impl ThoughtRow {
    fn into_record(self) -> ThoughtRecord {
        ThoughtRecord {
            id: self.id,
            content: self.content,
            thought_type: ThoughtType::parse_lossy(&self.thought_type),
            confidence: self.confidence as f32,
            timestamp: parse_db_time(&self.created_at),
            session_id: self.session_id,
        }
    }
}

#[derive(FromRow)]
struct FullThoughtRow {
    id: String,
    session_id: String,
    content: String,
    thought_type: String,
    confidence: f64,
    sequence_order: i64,
    created_at: String,
}

impl FullThoughtRow {
    fn into_thought(self) -> Thought {
        Thought {
            id: self.id,
            session_id: self.session_id,
            content: self.content,
            thought_type: ThoughtType::parse_lossy(&self.thought_type),
            confidence: self.confidence as f32,
            sequence_order: self.sequence_order.max(0) as u32,
            created_at: parse_db_time(&self.created_at),
        }
    }
}

#[derive(FromRow)]
struct SessionRow {
    id: String,
    raw_text: String,
    reasoning_strategy: String,
    domain: String,
    success_indicators: String,
    created_at: String,
}

impl SessionRow {
    fn into_session(self) -> ThinkingSession {
        ThinkingSession {
            id: self.id,
            raw_text: self.raw_text,
            reasoning_strategy: self.reasoning_strategy,
            domain: self.domain,
            success_indicators: serde_json::from_str(&self.success_indicators).unwrap_or_default(),
            created_at: parse_db_time(&self.created_at),
        }
    }
}

#[derive(FromRow)]
struct SessionSummaryRow {
    id: String,
    reasoning_strategy: String,
    domain: String,
    created_at: String,
    thought_count: i64,
}

#[derive(FromRow)]
struct EntityContextRow {
    name: String,
    entity_type: String,
    definition: Option<String>,
    thought_count: i64,
}

#[derive(FromRow)]
struct EntityRow {
    name: String,
    entity_type: String,
    definition: Option<String>,
    created_at: String,
    updated_at: String,
}

#[derive(FromRow)]
struct ConnectionRow {
    name: String,
    entity_type: String,
    relationship_type: String,
    weight: f64,
}

#[derive(FromRow)]
struct SessionHeaderRow {
    id: String,
    reasoning_strategy: String,
    domain: String,
    created_at: String,
}

#[derive(FromRow)]
struct SimilarSessionRow {
    id: String,
    reasoning_strategy: String,
    domain: String,
    created_at: String,
    shared_entities: i64,
}
