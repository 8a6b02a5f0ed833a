//! Port trait for knowledge graph storage
//!
//! This module defines the contract every graph engine implements. The
//! trait abstracts over the in-memory engine and the persistent SQL engine;
//! nothing above this layer may depend on a concrete engine type.
//!
//! Mutating operations take `&mut self`: engines are single-writer, and
//! callers that share one across tasks serialize writers themselves
//! (for example behind a `tokio::sync::RwLock`).

use std::collections::BTreeMap;
use std::path::Path as FsPath;

use async_trait::async_trait;
use tracing::warn;

use crate::error::Result;

use super::entity::{Entity, EntityType};
use super::model::{
    AddResult, CentralityResult, CliqueResult, ExportResult, GraphStats, Neighbor, Path,
};
use super::relationship::{Relationship, RelationshipType};

/// Storage-and-retrieval contract for the knowledge graph
#[async_trait]
pub trait GraphPort: Send + Sync {
    // ========== Entity Operations ==========

    /// Add an entity; returns false if an entity with the same canonical
    /// name already exists
    async fn add_entity(&mut self, entity: &Entity) -> Result<bool>;

    /// Add entities one by one; duplicates and invalid items never abort the batch
    async fn add_entities(&mut self, entities: &[Entity]) -> Result<AddResult> {
        let mut result = AddResult::default();
        for entity in entities {
            match self.add_entity(entity).await {
                Ok(added) => result.record(added),
                Err(e) => {
                    warn!(entity = %entity.name, error = %e, "Skipping entity in batch");
                    result.failed += 1;
                }
            }
        }
        Ok(result)
    }

    /// Get an entity by name
    async fn get_entity(&self, name: &str) -> Result<Option<Entity>>;

    /// Check whether an entity exists
    async fn entity_exists(&self, name: &str) -> Result<bool> {
        Ok(self.get_entity(name).await?.is_some())
    }

    /// List entities in insertion order, optionally filtered by type
    async fn get_all_entities(
        &self,
        entity_type: Option<EntityType>,
        limit: Option<usize>,
    ) -> Result<Vec<Entity>>;

    /// Remove an entity and every relationship touching it
    async fn remove_entity(&mut self, name: &str) -> Result<bool>;

    // ========== Relationship Operations ==========

    /// Add a relationship, creating placeholder endpoints when missing;
    /// returns false if the (source, target, type) edge already exists
    async fn add_relationship(&mut self, relationship: &Relationship) -> Result<bool>;

    /// Add relationships one by one; never aborts the batch
    async fn add_relationships(&mut self, relationships: &[Relationship]) -> Result<AddResult> {
        let mut result = AddResult::default();
        for relationship in relationships {
            match self.add_relationship(relationship).await {
                Ok(added) => result.record(added),
                Err(e) => {
                    warn!(
                        source = %relationship.source,
                        target = %relationship.target,
                        error = %e,
                        "Skipping relationship in batch"
                    );
                    result.failed += 1;
                }
            }
        }
        Ok(result)
    }

    /// Relationships where the entity is source or target
    async fn get_relationships(
        &self,
        name: &str,
        relationship_type: Option<RelationshipType>,
    ) -> Result<Vec<Relationship>>;

    /// Relationships from `source` to `target`
    async fn get_relationships_between(&self, source: &str, target: &str)
    -> Result<Vec<Relationship>>;

    /// Remove a single typed relationship
    async fn remove_relationship(
        &mut self,
        source: &str,
        target: &str,
        relationship_type: RelationshipType,
    ) -> Result<bool>;

    /// Remove everything
    async fn clear(&mut self) -> Result<()>;

    // ========== Traversal Operations ==========

    /// Entities reachable along outgoing edges within `max_depth` hops
    ///
    /// Fails with `ENTITY_NOT_FOUND` if the root is absent.
    async fn get_neighbors(
        &self,
        name: &str,
        max_depth: u32,
        relationship_types: Option<&[RelationshipType]>,
    ) -> Result<Vec<Neighbor>>;

    /// Shortest directed path between two entities
    ///
    /// Fails with `ENTITY_NOT_FOUND` if either endpoint is absent.
    async fn find_path(
        &self,
        source: &str,
        target: &str,
        max_length: Option<usize>,
    ) -> Result<Option<Path>>;

    /// Shortest paths from one source to several targets; per-target
    /// failures become `None`
    async fn find_paths_multiple(
        &self,
        source: &str,
        targets: &[String],
        max_length: Option<usize>,
    ) -> Result<BTreeMap<String, Option<Path>>> {
        let mut paths = BTreeMap::new();
        for target in targets {
            let path = match self.find_path(source, target, max_length).await {
                Ok(path) => path,
                Err(e) => {
                    warn!(source = %source, target = %target, error = %e, "Path lookup failed");
                    None
                }
            };
            paths.insert(target.clone(), path);
        }
        Ok(paths)
    }

    /// Shortest paths from `source` to every reachable entity, keyed by
    /// target display name
    async fn find_all_shortest_paths(
        &self,
        source: &str,
        max_length: Option<usize>,
        cutoff: Option<usize>,
    ) -> Result<BTreeMap<String, Path>>;

    // ========== Analytics ==========

    /// Maximal cliques of the undirected projection
    async fn find_cliques(
        &self,
        min_size: usize,
        max_size: Option<usize>,
        entity_type: Option<EntityType>,
    ) -> Result<CliqueResult>;

    /// Centrality scores sorted by pagerank descending
    async fn get_centrality(
        &self,
        name: Option<&str>,
        top_n: Option<usize>,
    ) -> Result<Vec<CentralityResult>>;

    /// Graph statistics
    async fn get_stats(&self) -> Result<GraphStats>;

    /// Whether the engine can serve requests
    async fn health_check(&self) -> bool;

    // ========== Export ==========

    /// Export to JSON, inline or to a file
    async fn export_json(&self, path: Option<&FsPath>, pretty: bool) -> Result<ExportResult>;

    /// Export to GraphML, inline (`None`) or to a file
    async fn export_graphml(
        &self,
        path: Option<&FsPath>,
        include_metadata: bool,
    ) -> Result<ExportResult>;
}
