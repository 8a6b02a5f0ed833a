//! Enrichment against both engines

use std::sync::Arc;

use loregraph_core::domain::graph::{Entity, EntityType, GraphPort, Relationship, RelationshipType};
use loregraph_core::domain::import::{ExtractionBatch, import_extraction};
use loregraph_core::domain::retrieval::{
    EntityNameDetector, GraphRetrievalService, RetrievalConfig, RetrievedChunk, StepType,
};
use loregraph_core::infrastructure::graph::{InMemoryGraph, SqlGraph};

async fn only_bob<G: GraphPort>(mut graph: G) -> G {
    graph
        .add_entity(&Entity::new("Bob", EntityType::Character))
        .await
        .unwrap();
    graph
}

async fn assert_unknown_name_is_skipped<G: GraphPort + 'static>(graph: G) {
    let mut service = GraphRetrievalService::new(Arc::new(graph));
    let chunks = [RetrievedChunk::new("chunk-1", "Alice is a brave warrior.")];

    let result = service.enrich_chunks(&chunks, true).await.unwrap();
    assert_eq!(result.total_entities, 0);
    assert_eq!(result.cache_misses, 1);

    let explanation = result.explanation.unwrap();
    let lookups: Vec<_> = explanation.steps_of(StepType::EntityLookup).collect();
    assert_eq!(lookups.len(), 1);
    assert_eq!(lookups[0].primary_entity.as_deref(), Some("Alice"));
    assert_eq!(lookups[0].metadata["found"], false);
}

#[tokio::test]
async fn test_unknown_name_in_memory() {
    assert_unknown_name_is_skipped(only_bob(InMemoryGraph::new()).await).await;
}

#[tokio::test]
async fn test_unknown_name_in_sql() {
    assert_unknown_name_is_skipped(only_bob(SqlGraph::in_memory()).await).await;
}

#[tokio::test]
async fn test_enrichment_matches_across_engines() {
    let batch: ExtractionBatch = serde_json::from_str(
        r#"{
            "entities": [
                {"name": "Frodo Baggins", "type": "character", "description": "A hobbit of the Shire"},
                {"name": "The Shire", "type": "location"},
                {"name": "Sting", "type": "item", "aliases": ["the blade"]}
            ],
            "relationships": [
                {"source": "Frodo Baggins", "target": "The Shire", "type": "located_at"},
                {"source": "Frodo Baggins", "target": "Sting", "type": "owns", "strength": 0.9},
                {"source": "Bilbo", "target": "Frodo Baggins", "type": "mentored"}
            ]
        }"#,
    )
    .unwrap();

    let mut memory = InMemoryGraph::new();
    let mut sql = SqlGraph::in_memory();
    import_extraction(&mut memory, &batch).await.unwrap();
    import_extraction(&mut sql, &batch).await.unwrap();

    let chunks = [
        RetrievedChunk::new("c1", "Frodo Baggins drew Sting."),
        RetrievedChunk::new("c2", "Nobody in \"the shire\" slept."),
    ];

    let from_memory = GraphRetrievalService::new(Arc::new(memory))
        .enrich_chunks(&chunks, true)
        .await
        .unwrap();
    let from_sql = GraphRetrievalService::new(Arc::new(sql))
        .enrich_chunks(&chunks, true)
        .await
        .unwrap();

    assert_eq!(from_memory.chunks, from_sql.chunks);
    assert_eq!(from_memory.total_entities, from_sql.total_entities);
    assert_eq!(from_memory.total_relationships, from_sql.total_relationships);

    let first = &from_memory.chunks[0].graph_context;
    assert!(first.contains("- Frodo Baggins (character): A hobbit of the Shire"));
    assert!(first.contains("located_at The Shire"));
    assert!(first.contains("owns Sting"));
    assert!(from_memory.chunks[1].graph_context.contains("- The Shire (location)"));
}

/// Treats every whitespace-separated word as a candidate
struct EveryWord;

impl EntityNameDetector for EveryWord {
    fn detect(&self, text: &str, limit: usize) -> Vec<String> {
        text.split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .filter(|w| !w.is_empty())
            .take(limit)
            .collect()
    }
}

#[tokio::test]
async fn test_custom_detector_and_limits() {
    let mut graph = InMemoryGraph::new();
    for target in ["a", "b", "c", "d"] {
        graph
            .add_relationship(&Relationship::new("hub", target, RelationshipType::Knows))
            .await
            .unwrap();
    }

    let config = RetrievalConfig {
        max_entities_per_chunk: 2,
        max_relationships_per_entity: 2,
        ..RetrievalConfig::default()
    };
    let mut service =
        GraphRetrievalService::with_config(Arc::new(graph), config).with_detector(EveryWord);

    let result = service
        .enrich_chunks(&[RetrievedChunk::new("c1", "hub sighted near c")], false)
        .await
        .unwrap();

    // only "hub" and "sighted" are considered
    assert_eq!(result.cache_misses, 2);
    let hub_line = result.chunks[0]
        .graph_context
        .lines()
        .find(|l| l.starts_with("- hub"))
        .unwrap();
    assert_eq!(hub_line, "- hub (unknown) | knows a, knows b");
}
