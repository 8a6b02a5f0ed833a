//! Graph-augmented enrichment of retrieved chunks
//!
//! Chunks come back from vector search as plain text. The service finds
//! entity names in each chunk, resolves them through the [`GraphPort`],
//! expands their neighborhoods and attaches a compact description block
//! that can be dropped into a prompt next to the chunk text.

use std::collections::{HashMap, HashSet};
use std::path::Path as FsPath;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::graph::{
    CentralityResult, EdgeKey, Entity, ExportFormat, ExportResult, GraphPort, GraphStats,
    Metadata, Neighbor, Path, Relationship, RelationshipType, canonicalize,
};
use crate::error::Result;

use super::detector::{EntityNameDetector, HeuristicNameDetector};
use super::explain::{ExplanationStep, ReasoningExplanation, ReasoningTrace, StepType};

/// Tuning for enrichment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Candidate names considered per chunk
    pub max_entities_per_chunk: usize,
    /// Neighbor expansion depth for each resolved entity
    pub expansion_depth: u32,
    /// Relationships listed per entity in the description block
    pub max_relationships_per_entity: usize,
    /// Record a reasoning trace by default
    pub explain: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_entities_per_chunk: 5,
            expansion_depth: 1,
            max_relationships_per_entity: 5,
            explain: false,
        }
    }
}

/// A chunk returned by vector search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub metadata: Metadata,
}

impl RetrievedChunk {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            score: 0.0,
            metadata: Metadata::new(),
        }
    }
}

/// A chunk with its graph context attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedChunk {
    pub chunk: RetrievedChunk,
    /// Entities found in the chunk plus their expanded neighbors
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
    /// One line per entity, empty when nothing resolved
    pub graph_context: String,
}

/// Outcome of one enrichment call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub chunks: Vec<EnrichedChunk>,
    /// Unique entities across the batch
    pub total_entities: usize,
    /// Unique (source, target, type) triples across the batch
    pub total_relationships: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<ReasoningExplanation>,
}

/// Everything the graph knows about one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityContext {
    pub entity: Entity,
    pub relationships: Vec<Relationship>,
    pub neighbors: Vec<Neighbor>,
}

/// Lookup cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Enriches retrieved chunks with knowledge graph context
pub struct GraphRetrievalService<P: GraphPort + ?Sized> {
    graph: Arc<P>,
    detector: Box<dyn EntityNameDetector>,
    config: RetrievalConfig,
    stats: CacheStats,
}

impl<P: GraphPort + ?Sized> GraphRetrievalService<P> {
    pub fn new(graph: Arc<P>) -> Self {
        Self::with_config(graph, RetrievalConfig::default())
    }

    pub fn with_config(graph: Arc<P>, config: RetrievalConfig) -> Self {
        Self {
            graph,
            detector: Box::new(HeuristicNameDetector::new()),
            config,
            stats: CacheStats::default(),
        }
    }

    /// Replace the name detector
    pub fn with_detector(mut self, detector: impl EntityNameDetector + 'static) -> Self {
        self.detector = Box::new(detector);
        self
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.stats
    }

    pub fn reset_cache_stats(&mut self) {
        self.stats = CacheStats::default();
    }

    // ========== Enrichment ==========

    /// Enrich chunks, recording a trace when `explain` is set
    ///
    /// Names that don't resolve are skipped. Only port failures are errors.
    pub async fn enrich_chunks(
        &mut self,
        chunks: &[RetrievedChunk],
        explain: bool,
    ) -> Result<EnrichmentResult> {
        let mut cache: HashMap<String, Option<EntityContext>> = HashMap::new();
        let mut trace = explain.then(ReasoningTrace::new);
        let mut all_entities: HashSet<String> = HashSet::new();
        let mut all_relationships: HashSet<EdgeKey> = HashSet::new();
        let mut enriched = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            let candidates = self
                .detector
                .detect(&chunk.content, self.config.max_entities_per_chunk);
            debug!(chunk = %chunk.id, candidates = candidates.len(), "Detected entity names");

            if let Some(trace) = trace.as_mut() {
                trace.record(
                    ExplanationStep::new(
                        StepType::EntityExtraction,
                        format!(
                            "Detected {} candidate names in chunk {}",
                            candidates.len(),
                            chunk.id
                        ),
                    )
                    .with_related(candidates.clone())
                    .with_relevance(if candidates.is_empty() { 0.0 } else { 1.0 })
                    .with_metadata("chunk_id", chunk.id.as_str())
                    .with_metadata("candidate_count", candidates.len()),
                );
            }

            let mut chunk_entities: Vec<Entity> = Vec::new();
            let mut chunk_relationships: Vec<Relationship> = Vec::new();
            let mut seen_entities: HashSet<String> = HashSet::new();
            let mut seen_relationships: HashSet<EdgeKey> = HashSet::new();

            for candidate in &candidates {
                let key = canonicalize(candidate);
                let cached = cache.contains_key(&key);
                if cached {
                    self.stats.hits += 1;
                } else {
                    self.stats.misses += 1;
                    let context = self.lookup(candidate).await?;
                    cache.insert(key.clone(), context);
                }
                let Some(context) = cache.get(&key).and_then(Option::as_ref) else {
                    debug!(candidate = %candidate, "Candidate not in graph");
                    if let Some(trace) = trace.as_mut() {
                        trace.record(
                            ExplanationStep::new(
                                StepType::EntityLookup,
                                format!("'{}' is not in the graph", candidate),
                            )
                            .with_primary(candidate.as_str())
                            .with_metadata("found", false)
                            .with_metadata("cached", cached),
                        );
                    }
                    continue;
                };

                if let Some(trace) = trace.as_mut() {
                    record_resolution(trace, candidate, context, cached, self.config.expansion_depth);
                }

                let found = std::iter::once(&context.entity)
                    .chain(context.neighbors.iter().map(|n| &n.entity));
                for entity in found {
                    let canonical = entity.canonical_name();
                    all_entities.insert(canonical.clone());
                    if seen_entities.insert(canonical) {
                        chunk_entities.push(entity.clone());
                    }
                }

                let related = context
                    .relationships
                    .iter()
                    .chain(context.neighbors.iter().map(|n| &n.relationship));
                for relationship in related {
                    let edge = relationship.key();
                    all_relationships.insert(edge.clone());
                    if seen_relationships.insert(edge) {
                        chunk_relationships.push(relationship.clone());
                    }
                }
            }

            let graph_context = describe_entities(
                &chunk_entities,
                &chunk_relationships,
                self.config.max_relationships_per_entity,
            );
            enriched.push(EnrichedChunk {
                chunk: chunk.clone(),
                entities: chunk_entities,
                relationships: chunk_relationships,
                graph_context,
            });
        }

        info!(
            chunks = enriched.len(),
            entities = all_entities.len(),
            relationships = all_relationships.len(),
            cache_hits = self.stats.hits,
            cache_misses = self.stats.misses,
            "Enriched chunks with graph context"
        );

        Ok(EnrichmentResult {
            chunks: enriched,
            total_entities: all_entities.len(),
            total_relationships: all_relationships.len(),
            cache_hits: self.stats.hits,
            cache_misses: self.stats.misses,
            explanation: trace.map(ReasoningTrace::finish),
        })
    }

    /// Enrich using the configured explain default
    pub async fn enrich(&mut self, chunks: &[RetrievedChunk]) -> Result<EnrichmentResult> {
        let explain = self.config.explain;
        self.enrich_chunks(chunks, explain).await
    }

    async fn lookup(&self, name: &str) -> Result<Option<EntityContext>> {
        let Some(entity) = self.graph.get_entity(name).await? else {
            return Ok(None);
        };
        let neighbors = self
            .graph
            .get_neighbors(&entity.name, self.config.expansion_depth, None)
            .await?;
        let relationships = self.graph.get_relationships(&entity.name, None).await?;
        Ok(Some(EntityContext {
            entity,
            relationships,
            neighbors,
        }))
    }

    // ========== Standalone Queries ==========

    /// The entity with its relationships and neighbors, or `None` if absent
    pub async fn get_entity_context(&self, name: &str) -> Result<Option<EntityContext>> {
        self.lookup(name).await
    }

    /// Entities reachable from `name`, nearest first, capped at `limit`
    pub async fn find_related_entities(
        &self,
        name: &str,
        relationship_types: Option<&[RelationshipType]>,
        max_depth: u32,
        limit: Option<usize>,
    ) -> Result<Vec<Neighbor>> {
        if !self.graph.entity_exists(name).await? {
            return Ok(Vec::new());
        }
        let mut related = self
            .graph
            .get_neighbors(name, max_depth, relationship_types)
            .await?;
        if let Some(limit) = limit {
            related.truncate(limit);
        }
        Ok(related)
    }

    pub async fn get_entity_centrality(&self, name: &str) -> Result<Option<CentralityResult>> {
        if !self.graph.entity_exists(name).await? {
            return Ok(None);
        }
        let scores = self.graph.get_centrality(Some(name), Some(1)).await?;
        Ok(scores.into_iter().next())
    }

    pub async fn find_path(
        &self,
        source: &str,
        target: &str,
        max_length: Option<usize>,
    ) -> Result<Option<Path>> {
        self.graph.find_path(source, target, max_length).await
    }

    pub async fn get_graph_stats(&self) -> Result<GraphStats> {
        self.graph.get_stats().await
    }

    /// Export the graph; `pretty` applies to JSON, `include_metadata` to GraphML
    pub async fn export_graph(
        &self,
        format: ExportFormat,
        path: Option<&FsPath>,
        pretty: bool,
        include_metadata: bool,
    ) -> Result<ExportResult> {
        match format {
            ExportFormat::Json => self.graph.export_json(path, pretty).await,
            ExportFormat::Graphml => self.graph.export_graphml(path, include_metadata).await,
        }
    }
}

fn record_resolution(
    trace: &mut ReasoningTrace,
    candidate: &str,
    context: &EntityContext,
    cached: bool,
    expansion_depth: u32,
) {
    let entity = &context.entity;
    trace.record(
        ExplanationStep::new(
            StepType::EntityLookup,
            format!("'{}' resolved to {} ({})", candidate, entity.name, entity.entity_type),
        )
        .with_primary(entity.name.as_str())
        .with_relevance(1.0)
        .with_metadata("found", true)
        .with_metadata("cached", cached),
    );
    trace.found(&entity.name);

    let neighbor_names: Vec<String> = context
        .neighbors
        .iter()
        .map(|n| n.entity.name.clone())
        .collect();
    let relevance = if context.relationships.is_empty() {
        0.0
    } else {
        context.relationships.iter().map(|r| r.strength).sum::<f64>()
            / context.relationships.len() as f64
    };
    trace.record(
        ExplanationStep::new(
            StepType::RelationshipTraversal,
            format!(
                "Expanded {} to depth {}: {} neighbors, {} relationships",
                entity.name,
                expansion_depth,
                neighbor_names.len(),
                context.relationships.len()
            ),
        )
        .with_primary(entity.name.as_str())
        .with_related(neighbor_names)
        .with_relevance(relevance)
        .with_metadata("depth", expansion_depth)
        .with_metadata("neighbor_count", context.neighbors.len())
        .with_metadata("relationship_count", context.relationships.len())
        .with_metadata("cached", cached),
    );

    if !cached {
        let depth = context.neighbors.iter().map(|n| n.distance).max().unwrap_or(0);
        trace.traversed(context.relationships.len(), depth);
    }
}

/// One line per entity: name, type, description, aliases, outgoing relationships
fn describe_entities(
    entities: &[Entity],
    relationships: &[Relationship],
    max_relationships: usize,
) -> String {
    entities
        .iter()
        .map(|entity| {
            let mut line = format!("- {} ({})", entity.name, entity.entity_type);
            if !entity.description.is_empty() {
                line.push_str(&format!(": {}", entity.description));
            }
            if !entity.aliases.is_empty() {
                line.push_str(&format!(" [aliases: {}]", entity.aliases.join(", ")));
            }
            let canonical = entity.canonical_name();
            let outgoing: Vec<String> = relationships
                .iter()
                .filter(|r| canonicalize(&r.source) == canonical)
                .take(max_relationships)
                .map(|r| format!("{} {}", r.relationship_type, r.target))
                .collect();
            if !outgoing.is_empty() {
                line.push_str(&format!(" | {}", outgoing.join(", ")));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}
