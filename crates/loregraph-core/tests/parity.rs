//! Analytics computed by the persistent engine match the in-memory engine

use loregraph_core::domain::graph::{
    CentralityResult, Entity, EntityType, GraphPort, Relationship, RelationshipType,
};
use loregraph_core::infrastructure::graph::{InMemoryGraph, SqlGraph, SqlGraphSettings};

use RelationshipType::*;

const TOLERANCE: f64 = 1e-9;

/// Two factions joined through a single go-between, plus a dangling node
async fn fixture<G: GraphPort>(graph: &mut G) {
    let entities = [
        Entity::new("Aragorn", EntityType::Character),
        Entity::new("Legolas", EntityType::Character),
        Entity::new("Gimli", EntityType::Character),
        Entity::new("Gandalf", EntityType::Character),
        Entity::new("Saruman", EntityType::Character),
        Entity::new("Grima", EntityType::Character),
        Entity::new("Isengard", EntityType::Location),
        Entity::new("Fellowship", EntityType::Organization),
    ];
    graph.add_entities(&entities).await.unwrap();

    let edges = [
        ("Aragorn", "Legolas", AlliedWith),
        ("Legolas", "Gimli", AlliedWith),
        ("Gimli", "Aragorn", AlliedWith),
        ("Aragorn", "Gandalf", Knows),
        ("Gandalf", "Legolas", Knows),
        ("Gandalf", "Saruman", Knows),
        ("Saruman", "Gandalf", EnemyOf),
        ("Grima", "Saruman", Serves),
        ("Saruman", "Grima", Leads),
        ("Saruman", "Isengard", LocatedAt),
        ("Grima", "Isengard", LocatedAt),
        ("Aragorn", "Fellowship", MemberOf),
        ("Aragorn", "Aragorn", Knows),
    ];
    for (source, target, relationship_type) in edges {
        graph
            .add_relationship(&Relationship::new(source, target, relationship_type))
            .await
            .unwrap();
    }
}

async fn engines() -> (InMemoryGraph, SqlGraph) {
    let mut memory = InMemoryGraph::new();
    let mut sql = SqlGraph::in_memory();
    fixture(&mut memory).await;
    fixture(&mut sql).await;
    (memory, sql)
}

fn assert_scores_match(left: &[CentralityResult], right: &[CentralityResult]) {
    assert_eq!(left.len(), right.len());
    for (l, r) in left.iter().zip(right) {
        assert_eq!(l.entity, r.entity);
        assert!((l.degree - r.degree).abs() < TOLERANCE, "degree of {}", l.entity);
        assert!((l.betweenness - r.betweenness).abs() < TOLERANCE, "betweenness of {}", l.entity);
        assert!((l.closeness - r.closeness).abs() < TOLERANCE, "closeness of {}", l.entity);
        assert!((l.pagerank - r.pagerank).abs() < TOLERANCE, "pagerank of {}", l.entity);
    }
}

#[tokio::test]
async fn test_centrality_parity() {
    let (memory, sql) = engines().await;

    let expected = memory.get_centrality(None, None).await.unwrap();
    let actual = sql.get_centrality(None, None).await.unwrap();
    assert_eq!(expected.len(), 8);
    assert_scores_match(&expected, &actual);

    let pagerank_total: f64 = expected.iter().map(|s| s.pagerank).sum();
    assert!((pagerank_total - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_single_entity_centrality_parity() {
    let (memory, sql) = engines().await;

    let expected = memory.get_centrality(Some("gandalf"), None).await.unwrap();
    let actual = sql.get_centrality(Some("Gandalf"), None).await.unwrap();
    assert_eq!(expected.len(), 1);
    assert_eq!(expected[0].entity, "Gandalf");
    assert_scores_match(&expected, &actual);
    // Gandalf is the only bridge between the two factions
    assert!(expected[0].betweenness > 0.4);
}

#[tokio::test]
async fn test_top_n_parity() {
    let (memory, sql) = engines().await;

    let expected = memory.get_centrality(None, Some(3)).await.unwrap();
    let actual = sql.get_centrality(None, Some(3)).await.unwrap();
    assert_eq!(expected.len(), 3);
    assert_scores_match(&expected, &actual);
}

#[tokio::test]
async fn test_clique_parity() {
    let (memory, sql) = engines().await;

    for (min, max, entity_type) in [
        (2, None, None),
        (3, None, None),
        (3, Some(3), Some(EntityType::Character)),
        (2, Some(2), Some(EntityType::Location)),
    ] {
        let expected = memory.find_cliques(min, max, entity_type).await.unwrap();
        let actual = sql.find_cliques(min, max, entity_type).await.unwrap();
        assert_eq!(expected, actual, "min={} max={:?} type={:?}", min, max, entity_type);
    }

    let triangles = memory.find_cliques(3, None, None).await.unwrap();
    assert!(triangles.cliques.contains(&vec![
        "Aragorn".to_string(),
        "Gimli".to_string(),
        "Legolas".to_string(),
    ]));
    assert!(triangles.cliques.contains(&vec![
        "Grima".to_string(),
        "Isengard".to_string(),
        "Saruman".to_string(),
    ]));
}

#[tokio::test]
async fn test_parity_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let uri = format!("sqlite:{}", dir.path().join("graph.db").display());

    let mut writer = SqlGraph::new(SqlGraphSettings::new(uri.clone()));
    fixture(&mut writer).await;
    drop(writer);

    let reopened = SqlGraph::new(SqlGraphSettings::new(uri));
    let mut memory = InMemoryGraph::new();
    fixture(&mut memory).await;

    assert_eq!(
        reopened.get_stats().await.unwrap(),
        memory.get_stats().await.unwrap()
    );
    assert_scores_match(
        &memory.get_centrality(None, None).await.unwrap(),
        &reopened.get_centrality(None, None).await.unwrap(),
    );
}

/// Several equally short routes from A to E, every edge equally strong
const DIAMONDS: [(&str, &str); 8] = [
    ("A", "B"),
    ("A", "C"),
    ("B", "D"),
    ("C", "D"),
    ("B", "F"),
    ("C", "F"),
    ("D", "E"),
    ("F", "E"),
];

async fn diamonds<G: GraphPort>(mut graph: G, reverse: bool) -> G {
    let mut edges: Vec<_> = DIAMONDS.iter().collect();
    if reverse {
        edges.reverse();
    }
    for &(source, target) in edges {
        graph
            .add_relationship(&Relationship::new(source, target, Knows))
            .await
            .unwrap();
    }
    graph
}

/// Neighbors as (name, parent, distance), the A to E path, every shortest path
type TraversalView = (Vec<(String, String, u32)>, Vec<String>, Vec<Vec<String>>);

async fn traversal_view<G: GraphPort>(graph: &G) -> TraversalView {
    let neighbors = graph
        .get_neighbors("A", 3, None)
        .await
        .unwrap()
        .into_iter()
        .map(|n| (n.entity.name, n.relationship.source, n.distance))
        .collect();
    let path = graph.find_path("A", "E", None).await.unwrap().unwrap().entities;
    let all = graph
        .find_all_shortest_paths("A", None, None)
        .await
        .unwrap()
        .into_values()
        .map(|p| p.entities)
        .collect();
    (neighbors, path, all)
}

#[tokio::test]
async fn test_tied_traversals_match_in_any_insertion_order() {
    let baseline = traversal_view(&diamonds(InMemoryGraph::new(), false).await).await;

    for reverse in [false, true] {
        let memory = diamonds(InMemoryGraph::new(), reverse).await;
        let sql = diamonds(SqlGraph::in_memory(), reverse).await;
        assert_eq!(traversal_view(&memory).await, baseline, "in-memory, reverse={}", reverse);
        assert_eq!(traversal_view(&sql).await, baseline, "sql, reverse={}", reverse);
    }

    let (neighbors, path, _) = baseline;
    let d = neighbors.iter().find(|(name, _, _)| name == "D").unwrap();
    assert_eq!(d.1, "B");
    assert_eq!(path.len(), 4);
}
