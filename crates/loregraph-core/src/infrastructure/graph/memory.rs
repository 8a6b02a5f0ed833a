//! In-process graph engine backed by petgraph
//!
//! Nodes live in a [`StableDiGraph`] so indices survive removals. Identity is
//! enforced through two side indexes: canonical name → node and
//! (source, target, type) → edge. Insertion order is tracked separately so
//! listings and snapshots are stable.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path as FsPath;

use async_trait::async_trait;
use petgraph::Direction;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use tracing::{debug, info};

use crate::domain::graph::algorithms::{self, bidirectional_shortest_path, neighbor_order, strongest};
use crate::domain::graph::export::export_snapshot;
use crate::domain::graph::{
    CentralityResult, CliqueResult, EdgeKey, Entity, EntityType, ExportFormat, ExportResult,
    GraphPort, GraphSnapshot, GraphStats, Neighbor, Path, Relationship, RelationshipType,
    canonicalize,
};
use crate::error::{ErrorCode, GraphError, Result};

/// In-memory graph engine
#[derive(Debug, Default)]
pub struct InMemoryGraph {
    graph: StableDiGraph<Entity, Relationship>,
    nodes: HashMap<String, NodeIndex>,
    edges: HashMap<EdgeKey, EdgeIndex>,
    node_order: Vec<NodeIndex>,
    edge_order: Vec<EdgeIndex>,
}

impl InMemoryGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&self, name: &str) -> Option<NodeIndex> {
        self.nodes.get(&canonicalize(name)).copied()
    }

    fn require_node(&self, name: &str) -> Result<NodeIndex> {
        self.node(name).ok_or_else(|| GraphError::entity_not_found(name))
    }

    fn insert_node(&mut self, entity: Entity) -> NodeIndex {
        let canonical = entity.canonical_name();
        let index = self.graph.add_node(entity);
        self.nodes.insert(canonical, index);
        self.node_order.push(index);
        index
    }

    /// Resolve an endpoint, creating a placeholder when it is missing
    fn ensure_node(&mut self, name: &str) -> NodeIndex {
        match self.node(name) {
            Some(index) => index,
            None => {
                debug!(entity = %name, "Creating placeholder entity");
                self.insert_node(Entity::placeholder(name.trim()))
            }
        }
    }

    /// Sorted, de-duplicated neighbours in one direction
    fn adjacent(&self, index: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut adjacent: Vec<NodeIndex> = self.graph.neighbors_directed(index, direction).collect();
        adjacent.sort_by_key(|n| self.graph[*n].canonical_name());
        adjacent.dedup();
        adjacent
    }

    /// Strongest edge from `source` to `target`
    fn connecting(&self, source: NodeIndex, target: NodeIndex) -> Option<&Relationship> {
        strongest(self.graph.edges_connecting(source, target).map(|e| e.weight()))
    }

    fn path_from_nodes(&self, nodes: &[NodeIndex]) -> Option<Path> {
        let names = nodes.iter().map(|n| self.graph[*n].name.clone()).collect();
        let mut relationships = Vec::with_capacity(nodes.len().saturating_sub(1));
        for hop in nodes.windows(2) {
            relationships.push(self.connecting(hop[0], hop[1])?.clone());
        }
        Some(Path::new(names, relationships))
    }

    /// Copy the graph into a snapshot, preserving insertion order
    pub fn snapshot(&self) -> GraphSnapshot {
        let entities = self
            .node_order
            .iter()
            .map(|n| self.graph[*n].clone())
            .collect();
        let relationships = self
            .edge_order
            .iter()
            .map(|e| self.graph[*e].clone())
            .collect();
        GraphSnapshot::new(entities, relationships)
    }

    /// Number of entities
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of relationships
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

#[async_trait]
impl GraphPort for InMemoryGraph {
    // ========== Entity Operations ==========

    async fn add_entity(&mut self, entity: &Entity) -> Result<bool> {
        if !entity.is_valid() {
            return Err(GraphError::new(ErrorCode::AddEntityFailed, "Entity name must not be empty")
                .with_detail("entity", &entity.name));
        }
        if self.node(&entity.name).is_some() {
            debug!(entity = %entity.name, "Entity already exists");
            return Ok(false);
        }

        self.insert_node(entity.clone());
        debug!(entity = %entity.name, entity_type = %entity.entity_type, "Entity added");
        Ok(true)
    }

    async fn get_entity(&self, name: &str) -> Result<Option<Entity>> {
        Ok(self.node(name).map(|n| self.graph[n].clone()))
    }

    async fn get_all_entities(
        &self,
        entity_type: Option<EntityType>,
        limit: Option<usize>,
    ) -> Result<Vec<Entity>> {
        Ok(self
            .node_order
            .iter()
            .map(|n| &self.graph[*n])
            .filter(|e| entity_type.is_none_or(|t| e.entity_type == t))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn remove_entity(&mut self, name: &str) -> Result<bool> {
        let Some(index) = self.nodes.remove(&canonicalize(name)) else {
            return Ok(false);
        };

        let touching: HashSet<EdgeIndex> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .chain(self.graph.edges_directed(index, Direction::Incoming))
            .map(|e| e.id())
            .collect();
        for edge in &touching {
            if let Some(relationship) = self.graph.edge_weight(*edge) {
                self.edges.remove(&relationship.key());
            }
        }
        self.edge_order.retain(|e| !touching.contains(e));
        self.node_order.retain(|n| *n != index);
        self.graph.remove_node(index);

        info!(entity = %name, relationships_removed = touching.len(), "Entity removed");
        Ok(true)
    }

    // ========== Relationship Operations ==========

    async fn add_relationship(&mut self, relationship: &Relationship) -> Result<bool> {
        if let Some(reason) = relationship.validation_error() {
            return Err(GraphError::new(ErrorCode::AddRelationshipFailed, "Invalid relationship")
                .with_detail("source", &relationship.source)
                .with_detail("target", &relationship.target)
                .with_detail("reason", reason));
        }

        let key = relationship.key();
        if self.edges.contains_key(&key) {
            debug!(
                source = %relationship.source,
                target = %relationship.target,
                relationship_type = %relationship.relationship_type,
                "Relationship already exists"
            );
            return Ok(false);
        }

        let source = self.ensure_node(&relationship.source);
        let target = self.ensure_node(&relationship.target);

        let mut stored = relationship.clone();
        stored.source = self.graph[source].name.clone();
        stored.target = self.graph[target].name.clone();

        let edge = self.graph.add_edge(source, target, stored);
        self.edges.insert(key, edge);
        self.edge_order.push(edge);

        debug!(
            source = %relationship.source,
            target = %relationship.target,
            relationship_type = %relationship.relationship_type,
            "Relationship added"
        );
        Ok(true)
    }

    async fn get_relationships(
        &self,
        name: &str,
        relationship_type: Option<RelationshipType>,
    ) -> Result<Vec<Relationship>> {
        let Some(index) = self.node(name) else {
            return Ok(Vec::new());
        };

        Ok(self
            .edge_order
            .iter()
            .filter_map(|e| {
                let (source, target) = self.graph.edge_endpoints(*e)?;
                (source == index || target == index).then(|| &self.graph[*e])
            })
            .filter(|r| relationship_type.is_none_or(|t| r.relationship_type == t))
            .cloned()
            .collect())
    }

    async fn get_relationships_between(
        &self,
        source: &str,
        target: &str,
    ) -> Result<Vec<Relationship>> {
        let (Some(source), Some(target)) = (self.node(source), self.node(target)) else {
            return Ok(Vec::new());
        };

        Ok(self
            .edge_order
            .iter()
            .filter(|e| self.graph.edge_endpoints(**e) == Some((source, target)))
            .map(|e| self.graph[*e].clone())
            .collect())
    }

    async fn remove_relationship(
        &mut self,
        source: &str,
        target: &str,
        relationship_type: RelationshipType,
    ) -> Result<bool> {
        let Some(edge) = self.edges.remove(&EdgeKey::new(source, target, relationship_type)) else {
            return Ok(false);
        };
        self.graph.remove_edge(edge);
        self.edge_order.retain(|e| *e != edge);

        info!(
            source = %source,
            target = %target,
            relationship_type = %relationship_type,
            "Relationship removed"
        );
        Ok(true)
    }

    async fn clear(&mut self) -> Result<()> {
        let (nodes, edges) = (self.graph.node_count(), self.graph.edge_count());
        self.graph.clear();
        self.nodes.clear();
        self.edges.clear();
        self.node_order.clear();
        self.edge_order.clear();
        info!(nodes, edges, "Graph cleared");
        Ok(())
    }

    // ========== Traversal Operations ==========

    async fn get_neighbors(
        &self,
        name: &str,
        max_depth: u32,
        relationship_types: Option<&[RelationshipType]>,
    ) -> Result<Vec<Neighbor>> {
        let root = self.require_node(name)?;
        let allowed = |r: &Relationship| relationship_types.is_none_or(|ts| ts.contains(&r.relationship_type));

        let mut visited = HashSet::from([root]);
        let mut frontier = vec![root];
        let mut neighbors = Vec::new();

        for distance in 1..=max_depth {
            // strongest edge into each node first reached at this depth
            let mut reached: BTreeMap<NodeIndex, &Relationship> = BTreeMap::new();
            for node in &frontier {
                for edge in self.graph.edges_directed(*node, Direction::Outgoing) {
                    let relationship = edge.weight();
                    if visited.contains(&edge.target()) || !allowed(relationship) {
                        continue;
                    }
                    reached
                        .entry(edge.target())
                        .and_modify(|best| {
                            if let Some(chosen) = strongest([*best, relationship]) {
                                *best = chosen;
                            }
                        })
                        .or_insert(relationship);
                }
            }
            if reached.is_empty() {
                break;
            }

            frontier = reached.keys().copied().collect();
            for (node, relationship) in reached {
                visited.insert(node);
                neighbors.push(Neighbor {
                    entity: self.graph[node].clone(),
                    relationship: relationship.clone(),
                    distance,
                });
            }
        }

        neighbors.sort_by(neighbor_order);
        debug!(entity = %name, max_depth, count = neighbors.len(), "Neighbors found");
        Ok(neighbors)
    }

    async fn find_path(
        &self,
        source: &str,
        target: &str,
        max_length: Option<usize>,
    ) -> Result<Option<Path>> {
        let from = self.require_node(source)?;
        let to = self.require_node(target)?;
        if from == to {
            return Ok(Some(Path::trivial(self.graph[from].name.clone())));
        }

        let nodes = bidirectional_shortest_path(
            from,
            to,
            |n| self.adjacent(n, Direction::Outgoing),
            |n| self.adjacent(n, Direction::Incoming),
        );
        let path = nodes
            .filter(|nodes| max_length.is_none_or(|m| nodes.len() - 1 <= m))
            .and_then(|nodes| self.path_from_nodes(&nodes));

        debug!(source = %source, target = %target, found = path.is_some(), "Path lookup");
        Ok(path)
    }

    async fn find_all_shortest_paths(
        &self,
        source: &str,
        max_length: Option<usize>,
        cutoff: Option<usize>,
    ) -> Result<BTreeMap<String, Path>> {
        let from = self.require_node(source)?;
        let bound = match (max_length, cutoff) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };

        let mut paths = BTreeMap::new();
        for (target, nodes) in
            algorithms::single_source_shortest_paths(from, bound, |n| self.adjacent(n, Direction::Outgoing))
        {
            if let Some(path) = self.path_from_nodes(&nodes) {
                paths.insert(self.graph[target].name.clone(), path);
            }
        }
        Ok(paths)
    }

    // ========== Analytics ==========

    async fn find_cliques(
        &self,
        min_size: usize,
        max_size: Option<usize>,
        entity_type: Option<EntityType>,
    ) -> Result<CliqueResult> {
        Ok(algorithms::find_cliques(&self.snapshot(), min_size, max_size, entity_type))
    }

    async fn get_centrality(
        &self,
        name: Option<&str>,
        top_n: Option<usize>,
    ) -> Result<Vec<CentralityResult>> {
        Ok(algorithms::centrality(&self.snapshot(), name, top_n))
    }

    async fn get_stats(&self) -> Result<GraphStats> {
        Ok(GraphStats {
            node_count: self.graph.node_count(),
            edge_count: self.graph.edge_count(),
            entity_types: algorithms::type_counts(self.graph.node_weights().map(|e| e.entity_type)),
            relationship_types: algorithms::type_counts(
                self.graph.edge_weights().map(|r| r.relationship_type),
            ),
        })
    }

    async fn health_check(&self) -> bool {
        true
    }

    // ========== Export ==========

    async fn export_json(&self, path: Option<&FsPath>, pretty: bool) -> Result<ExportResult> {
        export_snapshot(&self.snapshot(), ExportFormat::Json, path, pretty, true)
    }

    async fn export_graphml(
        &self,
        path: Option<&FsPath>,
        include_metadata: bool,
    ) -> Result<ExportResult> {
        export_snapshot(&self.snapshot(), ExportFormat::Graphml, path, false, include_metadata)
    }
}
