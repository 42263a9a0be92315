//! Graph database handle
//!
//! Opens the SQLite file behind the knowledge graph (or a private in-memory
//! database) and brings its schema up to date on every open.

use crate::storage::migrations;
use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Pool size for file databases
const FILE_POOL_SIZE: u32 = 5;

/// Where the graph lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    File(PathBuf),
    /// One private database per pool; the pool holds a single connection
    Memory,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub location: DatabaseLocation,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::with_path(default_database_path())
    }
}

impl DatabaseConfig {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            location: DatabaseLocation::File(path.into()),
            max_connections: FILE_POOL_SIZE,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            location: DatabaseLocation::Memory,
            max_connections: 1,
        }
    }

    fn connect_options(&self) -> Result<SqliteConnectOptions> {
        let options = match &self.location {
            DatabaseLocation::Memory => SqliteConnectOptions::from_str("sqlite::memory:")?,
            DatabaseLocation::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create database directory: {}", parent.display())
                    })?;
                }
                SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal)
            }
        };
        // Session deletes cascade to thoughts and their edges
        Ok(options.foreign_keys(true))
    }
}

/// `graph.db` under the platform config directory
pub fn default_database_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("thinkgraph").join("graph.db"))
        .unwrap_or_else(|| PathBuf::from("graph.db"))
}

/// Connection pool over the graph database
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    location: DatabaseLocation,
}

impl Database {
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(config.connect_options()?)
            .await
            .with_context(|| format!("Failed to open graph database: {:?}", config.location))?;

        let db = Self {
            pool,
            location: config.location,
        };
        db.migrate().await?;

        tracing::debug!(location = ?db.location, "Graph database ready");
        Ok(db)
    }

    pub async fn in_memory() -> Result<Self> {
        Self::new(DatabaseConfig::in_memory()).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// File path, or `None` for an in-memory database
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            DatabaseLocation::File(path) => Some(path),
            DatabaseLocation::Memory => None,
        }
    }

    pub async fn migrate(&self) -> Result<()> {
        migrations::run_migrations(&self.pool)
            .await
            .context("Failed to migrate graph schema")
    }

    pub async fn schema_version(&self) -> Result<i32> {
        Ok(migrations::migration_status(&self.pool).await?.current_version)
    }
}
