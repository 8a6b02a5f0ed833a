//! Loregraph Core Library
//!
//! This crate provides the knowledge graph behind narrative
//! retrieval-augmented generation, including:
//! - The graph port and its value types
//! - An in-memory engine (petgraph) and a persistent engine (SQLite)
//! - Shared graph algorithms: paths, cliques, centrality
//! - JSON and GraphML export
//! - Graph-augmented enrichment of retrieved chunks, with explain traces
//! - Import of typed extraction output

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod storage;

pub use error::{ErrorCode, GraphError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, GraphBackend};
    pub use crate::domain::graph::{
        Entity, EntityType, GraphPort, Neighbor, Path, Relationship, RelationshipType,
    };
    pub use crate::domain::retrieval::{GraphRetrievalService, RetrievedChunk};
    pub use crate::error::{ErrorCode, GraphError, Result};
    pub use crate::infrastructure::graph::{InMemoryGraph, SqlGraph, open_graph};
}
