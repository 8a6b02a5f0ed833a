//! Narrative knowledge graph domain module
//!
//! This module holds everything that is independent of a storage engine:
//!
//! - **Model**: entities, relationships and the values returned by queries
//! - **Port**: the [`GraphPort`] contract every engine implements
//! - **Algorithms**: traversal and analytics over a [`GraphSnapshot`]
//! - **Export**: JSON and GraphML serialisation
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                GraphRetrievalService                      │
//! └──────────────────────────────────────────────────────────┘
//!                          ↓  GraphPort
//! ┌───────────────────────────┐   ┌──────────────────────────┐
//! │  InMemoryGraph (petgraph) │   │  SqlGraph (sqlx/SQLite)   │
//! └───────────────────────────┘   └──────────────────────────┘
//!                          ↓  GraphSnapshot
//! ┌──────────────────────────────────────────────────────────┐
//! │   cliques · centrality · shortest paths · export          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use loregraph_core::domain::graph::{Entity, EntityType, GraphPort, Relationship, RelationshipType};
//! use loregraph_core::infrastructure::graph::InMemoryGraph;
//!
//! let mut graph = InMemoryGraph::new();
//! graph.add_entity(&Entity::new("Alice", EntityType::Character)).await?;
//! graph
//!     .add_relationship(&Relationship::new("Alice", "Bob", RelationshipType::Knows))
//!     .await?;
//!
//! let path = graph.find_path("alice", "BOB", None).await?;
//! ```

pub mod algorithms;
mod entity;
pub mod export;
mod model;
mod port;
mod relationship;

pub use algorithms::GraphSnapshot;
pub use entity::{Entity, EntityType, Metadata, canonicalize};
pub use export::GraphDocument;
pub use model::{
    AddResult, CentralityResult, CliqueResult, ExportFormat, ExportPayload, ExportResult,
    GraphStats, Neighbor, Path,
};
pub use port::GraphPort;
pub use relationship::{EdgeKey, Relationship, RelationshipType};

/// Hop bound applied to variable-length traversals when the caller gives none
pub const DEFAULT_MAX_HOPS: usize = 6;
