//! SQLite database operations
//!
//! Provides connection pool management for the persistent graph engine.

use crate::storage::migrations;
use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Default maximum connections in the pool
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// URI of a private in-memory database
pub const IN_MEMORY_URI: &str = "sqlite::memory:";

/// Idle time before a pooled file connection is closed
const FILE_IDLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Lifetime of a pooled file connection
const FILE_MAX_LIFETIME: Duration = Duration::from_secs(30 * 60);

/// Database configuration options
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Connection URI (`sqlite:<path>` or `sqlite::memory:`)
    pub uri: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Close connections idle this long; `None` keeps them open
    pub idle_timeout: Option<Duration>,
    /// Recycle connections after this long; `None` keeps them open
    pub max_lifetime: Option<Duration>,
    /// Journal mode (default: WAL)
    pub journal_mode: SqliteJournalMode,
    /// Synchronous mode (default: NORMAL)
    pub synchronous: SqliteSynchronous,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::with_uri(default_database_uri())
    }
}

impl DatabaseConfig {
    /// Create a new database config for the given URI
    pub fn with_uri(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        // a private in-memory database only lives on one connection, and
        // dropping that connection drops the data
        let (max_connections, idle_timeout, max_lifetime) = if is_in_memory(&uri) {
            (1, None, None)
        } else {
            (
                DEFAULT_MAX_CONNECTIONS,
                Some(FILE_IDLE_TIMEOUT),
                Some(FILE_MAX_LIFETIME),
            )
        };
        Self {
            uri,
            max_connections,
            idle_timeout,
            max_lifetime,
            journal_mode: SqliteJournalMode::Wal,
            synchronous: SqliteSynchronous::Normal,
        }
    }

    /// Set the maximum number of connections
    pub fn max_connections(mut self, max: u32) -> Self {
        if !is_in_memory(&self.uri) {
            self.max_connections = max;
        }
        self
    }

    /// Filesystem path of the database file, if the URI names one
    pub fn file_path(&self) -> Option<PathBuf> {
        if is_in_memory(&self.uri) {
            return None;
        }
        let rest = self
            .uri
            .strip_prefix("sqlite://")
            .or_else(|| self.uri.strip_prefix("sqlite:"))?;
        let path = rest.split('?').next().unwrap_or(rest);
        (!path.is_empty()).then(|| PathBuf::from(path))
    }
}

fn is_in_memory(uri: &str) -> bool {
    uri.contains(":memory:") || uri.contains("mode=memory")
}

/// Get the default database path
pub fn default_database_path() -> PathBuf {
    if let Some(data_dir) = dirs::data_dir() {
        data_dir.join("loregraph").join("graph.db")
    } else {
        PathBuf::from("loregraph.db")
    }
}

/// Get the default connection URI
pub fn default_database_uri() -> String {
    format!("sqlite:{}", default_database_path().display())
}

/// Database connection pool wrapper
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection with the given configuration
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        // Ensure the directory exists
        if let Some(parent) = config.file_path().as_deref().and_then(Path::parent) {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
            }
        }

        let connect_options = SqliteConnectOptions::from_str(&config.uri)
            .with_context(|| format!("Invalid database URI: {}", config.uri))?
            .journal_mode(config.journal_mode)
            .synchronous(config.synchronous)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", config.uri))?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        migrations::run_migrations(&self.pool)
            .await
            .context("Failed to run database migrations")
    }

    /// Check migration status
    pub async fn migration_status(&self) -> Result<migrations::MigrationStatus> {
        migrations::migration_status(&self.pool)
            .await
            .context("Failed to check migration status")
    }

    /// Check if database is healthy
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("Database health check failed")?;
        Ok(())
    }

}
