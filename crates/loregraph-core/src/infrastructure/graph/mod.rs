//! Graph engines
//!
//! - `memory`: petgraph-backed engine, state lives in the process
//! - `sql`: SQLite-backed engine, state survives restarts

pub mod memory;
pub mod sql;

pub use memory::InMemoryGraph;
pub use sql::{SqlGraph, SqlGraphSettings};

use tracing::info;

use crate::config::{GraphBackend, GraphConfig};
use crate::domain::graph::GraphPort;

impl SqlGraphSettings {
    /// Settings from the `[graph]` config section, password from the environment
    pub fn from_config(config: &GraphConfig) -> anyhow::Result<Self> {
        Ok(Self {
            uri: config.uri.clone(),
            user: config.user.clone(),
            password: config.resolved_password()?,
            database: config.database.clone(),
            max_connections: config.max_connections,
        })
    }
}

/// Build the engine selected by the configuration
///
/// The persistent engine connects lazily, so a bad URI surfaces on first use.
pub fn open_graph(config: &GraphConfig) -> anyhow::Result<Box<dyn GraphPort>> {
    info!(backend = %config.backend, "Opening graph engine");
    Ok(match config.backend {
        GraphBackend::Memory => Box::new(InMemoryGraph::new()),
        GraphBackend::Sql => Box::new(SqlGraph::new(SqlGraphSettings::from_config(config)?)),
    })
}
