//! Storage layer - SQLite pool and schema for the persistent graph engine
//!
//! # Architecture
//!
//! - `database`: Connection pool management and initialization
//! - `migrations`: Schema versioning and automatic migration
//!
//! # Usage
//!
//! ```ignore
//! use loregraph_core::storage::{Database, DatabaseConfig};
//!
//! let db = Database::new(DatabaseConfig::with_uri("sqlite:lore.db")).await?;
//! let pool = db.pool();
//! ```

pub mod database;
pub mod migrations;

pub use database::{
    Database, DatabaseConfig, DEFAULT_MAX_CONNECTIONS, IN_MEMORY_URI, default_database_path,
    default_database_uri,
};
pub use migrations::{migration_status, run_migrations, MigrationStatus, CURRENT_VERSION};
