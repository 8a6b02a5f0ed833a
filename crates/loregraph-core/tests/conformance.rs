//! Behavioural contract of the graph port, run against every engine

use loregraph_core::ErrorCode;
use loregraph_core::domain::graph::{
    Entity, EntityType, ExportPayload, GraphDocument, GraphPort, Relationship, RelationshipType,
};
use loregraph_core::infrastructure::graph::{InMemoryGraph, SqlGraph};

use RelationshipType::{AlliedWith, Knows, Loves};

/// Instantiate each case as a `#[tokio::test]` for one engine
macro_rules! conformance {
    ($engine:ident => $make:expr; $($case:ident),* $(,)?) => {
        mod $engine {
            use super::*;
            $(
                #[tokio::test]
                async fn $case() {
                    super::cases::$case($make).await;
                }
            )*
        }
    };
}

macro_rules! all_cases {
    ($engine:ident => $make:expr) => {
        conformance!($engine => $make;
            add_entity_is_idempotent,
            lookup_is_case_insensitive,
            blank_entity_is_rejected,
            batch_add_counts_outcomes,
            entities_listed_in_insertion_order,
            relationship_creates_placeholders,
            relationship_uses_stored_display_names,
            multigraph_law,
            invalid_relationship_is_rejected,
            relationship_type_filter,
            remove_relationship,
            remove_entity_cascades,
            clear_empties_graph,
            trivial_path,
            disconnected_path_is_absent,
            path_respects_max_length,
            path_to_missing_entity_fails,
            paths_to_multiple_targets,
            all_shortest_paths,
            complete_graph_paths,
            neighbors_exclude_root_and_duplicates,
            neighbors_of_missing_entity_fail,
            neighbor_type_filter,
            neighbor_ties_prefer_lowest_source,
            alice_bob_carol,
            stats_count_types,
            cliques_of_triangle,
            export_json_round_trip,
            export_json_to_nested_file,
            export_graphml_inline,
        );
    };
}

all_cases!(in_memory => InMemoryGraph::new());
all_cases!(sql => SqlGraph::in_memory());

mod cases {
    use super::*;

    fn character(name: &str) -> Entity {
        Entity::new(name, EntityType::Character)
    }

    async fn link<G: GraphPort>(graph: &mut G, edges: &[(&str, &str, RelationshipType)]) {
        for (source, target, relationship_type) in edges {
            assert!(
                graph
                    .add_relationship(&Relationship::new(*source, *target, *relationship_type))
                    .await
                    .unwrap()
            );
        }
    }

    fn names(entities: &[Entity]) -> Vec<&str> {
        entities.iter().map(|e| e.name.as_str()).collect()
    }

    // ========== Entities ==========

    pub async fn add_entity_is_idempotent<G: GraphPort>(mut graph: G) {
        let alice = character("Alice")
            .with_description("A brave warrior")
            .with_aliases(["Al", "The Blade"])
            .with_metadata("chapter", 3)
            .with_metadata("tags", serde_json::json!(["hero"]));

        assert!(graph.add_entity(&alice).await.unwrap());
        assert!(!graph.add_entity(&alice).await.unwrap());
        assert_eq!(graph.get_entity("Alice").await.unwrap(), Some(alice));
        assert_eq!(graph.get_stats().await.unwrap().node_count, 1);
    }

    pub async fn lookup_is_case_insensitive<G: GraphPort>(mut graph: G) {
        graph.add_entity(&character("Alice")).await.unwrap();

        let found = graph.get_entity("  aLiCe ").await.unwrap().unwrap();
        assert_eq!(found.name, "Alice");
        assert!(graph.entity_exists("ALICE").await.unwrap());
        assert!(!graph.add_entity(&character("alice")).await.unwrap());
        assert!(graph.get_entity("Bob").await.unwrap().is_none());
    }

    pub async fn blank_entity_is_rejected<G: GraphPort>(mut graph: G) {
        let err = graph.add_entity(&character("   ")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::AddEntityFailed);
    }

    pub async fn batch_add_counts_outcomes<G: GraphPort>(mut graph: G) {
        graph.add_entity(&character("Alice")).await.unwrap();
        let result = graph
            .add_entities(&[character("Alice"), character("Bob"), character(""), character("Carol")])
            .await
            .unwrap();
        assert_eq!((result.added, result.existing, result.failed), (2, 1, 1));

        let result = graph
            .add_relationships(&[
                Relationship::new("Alice", "Bob", Knows),
                Relationship::new("Alice", "Bob", Knows),
                Relationship::new("Alice", "", Knows),
            ])
            .await
            .unwrap();
        assert_eq!((result.added, result.existing, result.failed), (1, 1, 1));
    }

    pub async fn entities_listed_in_insertion_order<G: GraphPort>(mut graph: G) {
        graph.add_entity(&character("Carol")).await.unwrap();
        graph
            .add_entity(&Entity::new("Rivendell", EntityType::Location))
            .await
            .unwrap();
        graph.add_entity(&character("Alice")).await.unwrap();

        let all = graph.get_all_entities(None, None).await.unwrap();
        assert_eq!(names(&all), vec!["Carol", "Rivendell", "Alice"]);

        let characters = graph
            .get_all_entities(Some(EntityType::Character), None)
            .await
            .unwrap();
        assert_eq!(names(&characters), vec!["Carol", "Alice"]);

        let limited = graph.get_all_entities(None, Some(2)).await.unwrap();
        assert_eq!(names(&limited), vec!["Carol", "Rivendell"]);
    }

    // ========== Relationships ==========

    pub async fn relationship_creates_placeholders<G: GraphPort>(mut graph: G) {
        link(&mut graph, &[("Alice", "Bob", Knows)]).await;

        for name in ["Alice", "Bob"] {
            let placeholder = graph.get_entity(name).await.unwrap().unwrap();
            assert_eq!(placeholder.entity_type, EntityType::Unknown);
        }
        let stats = graph.get_stats().await.unwrap();
        assert_eq!((stats.node_count, stats.edge_count), (2, 1));
    }

    pub async fn relationship_uses_stored_display_names<G: GraphPort>(mut graph: G) {
        graph.add_entity(&character("Alice")).await.unwrap();
        link(&mut graph, &[("alice", "Bob", Knows)]).await;

        let stored = graph.get_relationships("ALICE", None).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].source, "Alice");
        assert_eq!(stored[0].target, "Bob");
    }

    pub async fn multigraph_law<G: GraphPort>(mut graph: G) {
        assert!(graph.add_relationship(&Relationship::new("A", "B", Knows)).await.unwrap());
        assert!(graph.add_relationship(&Relationship::new("A", "B", Loves)).await.unwrap());
        assert!(!graph.add_relationship(&Relationship::new("a", "b", Knows)).await.unwrap());

        let between = graph.get_relationships_between("A", "B").await.unwrap();
        let mut types: Vec<_> = between.iter().map(|r| r.relationship_type).collect();
        types.sort();
        assert_eq!(types, vec![Knows, Loves]);

        assert!(graph.get_relationships_between("B", "A").await.unwrap().is_empty());
        assert_eq!(graph.get_stats().await.unwrap().edge_count, 2);
    }

    pub async fn invalid_relationship_is_rejected<G: GraphPort>(mut graph: G) {
        let mut out_of_range = Relationship::new("A", "B", Knows);
        out_of_range.strength = 1.5;
        let err = graph.add_relationship(&out_of_range).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::AddRelationshipFailed);
        assert_eq!(graph.get_stats().await.unwrap().node_count, 0);
    }

    pub async fn relationship_type_filter<G: GraphPort>(mut graph: G) {
        link(
            &mut graph,
            &[("Alice", "Bob", Knows), ("Carol", "Alice", Loves), ("Bob", "Carol", Knows)],
        )
        .await;

        let all = graph.get_relationships("Alice", None).await.unwrap();
        assert_eq!(all.len(), 2);
        let loves = graph.get_relationships("Alice", Some(Loves)).await.unwrap();
        assert_eq!(loves.len(), 1);
        assert_eq!(loves[0].source, "Carol");
        assert!(graph.get_relationships("Nobody", None).await.unwrap().is_empty());
    }

    pub async fn remove_relationship<G: GraphPort>(mut graph: G) {
        link(&mut graph, &[("A", "B", Knows), ("A", "B", Loves)]).await;

        assert!(graph.remove_relationship("a", "b", Knows).await.unwrap());
        assert!(!graph.remove_relationship("A", "B", Knows).await.unwrap());

        let remaining = graph.get_relationships_between("A", "B").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].relationship_type, Loves);
        // endpoints stay
        assert_eq!(graph.get_stats().await.unwrap().node_count, 2);
    }

    pub async fn remove_entity_cascades<G: GraphPort>(mut graph: G) {
        link(
            &mut graph,
            &[("A", "B", Knows), ("B", "C", Knows), ("C", "B", Loves), ("A", "C", Knows)],
        )
        .await;

        assert!(graph.remove_entity("b").await.unwrap());
        assert!(!graph.remove_entity("B").await.unwrap());

        assert!(graph.get_relationships("B", None).await.unwrap().is_empty());
        assert!(graph.get_relationships_between("A", "B").await.unwrap().is_empty());
        assert!(graph.get_relationships_between("C", "B").await.unwrap().is_empty());
        let stats = graph.get_stats().await.unwrap();
        assert_eq!((stats.node_count, stats.edge_count), (2, 1));
    }

    pub async fn clear_empties_graph<G: GraphPort>(mut graph: G) {
        link(&mut graph, &[("A", "B", Knows)]).await;
        graph.clear().await.unwrap();

        let stats = graph.get_stats().await.unwrap();
        assert_eq!((stats.node_count, stats.edge_count), (0, 0));
        assert!(graph.add_entity(&character("A")).await.unwrap());
    }

    // ========== Paths ==========

    pub async fn trivial_path<G: GraphPort>(mut graph: G) {
        graph.add_entity(&character("Alice")).await.unwrap();

        let path = graph.find_path("Alice", "alice", None).await.unwrap().unwrap();
        assert_eq!(path.length, 0);
        assert_eq!(path.entities, vec!["Alice"]);
        assert!(path.relationships.is_empty());
    }

    pub async fn disconnected_path_is_absent<G: GraphPort>(mut graph: G) {
        link(&mut graph, &[("A", "B", Knows), ("C", "D", Knows)]).await;

        assert!(graph.find_path("A", "D", None).await.unwrap().is_none());
        // edges are directed
        assert!(graph.find_path("B", "A", None).await.unwrap().is_none());
    }

    pub async fn path_respects_max_length<G: GraphPort>(mut graph: G) {
        link(&mut graph, &[("A", "B", Knows), ("B", "C", Knows)]).await;

        assert!(graph.find_path("A", "C", Some(1)).await.unwrap().is_none());
        let path = graph.find_path("A", "C", Some(2)).await.unwrap().unwrap();
        assert_eq!(path.length, 2);
    }

    pub async fn path_to_missing_entity_fails<G: GraphPort>(mut graph: G) {
        graph.add_entity(&character("A")).await.unwrap();

        let err = graph.find_path("A", "Nobody", None).await.unwrap_err();
        assert!(err.is_not_found());
        let err = graph.find_path("Nobody", "A", None).await.unwrap_err();
        assert!(err.is_not_found());
    }

    pub async fn paths_to_multiple_targets<G: GraphPort>(mut graph: G) {
        link(&mut graph, &[("A", "B", Knows), ("B", "C", Knows)]).await;
        graph.add_entity(&character("D")).await.unwrap();

        let targets = vec!["C".to_string(), "D".to_string(), "Nobody".to_string()];
        let paths = graph.find_paths_multiple("A", &targets, None).await.unwrap();

        assert_eq!(paths.len(), 3);
        assert_eq!(paths["C"].as_ref().unwrap().length, 2);
        assert!(paths["D"].is_none());
        assert!(paths["Nobody"].is_none());
    }

    pub async fn all_shortest_paths<G: GraphPort>(mut graph: G) {
        link(
            &mut graph,
            &[("A", "B", Knows), ("B", "C", Knows), ("C", "D", Knows), ("A", "C", Loves)],
        )
        .await;

        let paths = graph.find_all_shortest_paths("A", None, None).await.unwrap();
        let keys: Vec<&str> = paths.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["B", "C", "D"]);
        assert_eq!(paths["C"].length, 1);
        assert_eq!(paths["C"].relationships[0].relationship_type, Loves);
        assert_eq!(paths["D"].entities, vec!["A", "C", "D"]);

        let bounded = graph.find_all_shortest_paths("A", Some(3), Some(1)).await.unwrap();
        assert_eq!(bounded.len(), 2);
        assert!(!bounded.contains_key("D"));
    }

    pub async fn complete_graph_paths<G: GraphPort>(mut graph: G) {
        let names: Vec<String> = (0..12).map(|i| format!("N{}", i)).collect();
        let mut edges = Vec::new();
        for source in &names {
            for target in names.iter().filter(|t| *t != source) {
                edges.push(Relationship::new(source, target, Knows));
            }
        }
        graph.add_relationships(&edges).await.unwrap();
        graph.add_entity(&character("Island")).await.unwrap();

        let searches = async {
            assert!(graph.find_path("N0", "Island", None).await.unwrap().is_none());
            assert_eq!(graph.find_path("N0", "N11", None).await.unwrap().unwrap().length, 1);

            let all = graph.find_all_shortest_paths("N0", None, None).await.unwrap();
            assert_eq!(all.len(), 11);
            assert!(!all.contains_key("Island"));
        };
        tokio::time::timeout(std::time::Duration::from_secs(10), searches)
            .await
            .expect("searches on a complete graph should finish quickly");
    }

    // ========== Traversal ==========

    pub async fn neighbors_exclude_root_and_duplicates<G: GraphPort>(mut graph: G) {
        link(
            &mut graph,
            &[("A", "B", Knows), ("B", "A", Knows), ("A", "C", Knows), ("B", "C", Loves), ("C", "A", Loves)],
        )
        .await;

        let neighbors = graph.get_neighbors("A", 3, None).await.unwrap();
        let mut found: Vec<&str> = neighbors.iter().map(|n| n.entity.name.as_str()).collect();
        found.sort();
        assert_eq!(found, vec!["B", "C"]);
        assert!(neighbors.iter().all(|n| n.distance == 1));
    }

    pub async fn neighbors_of_missing_entity_fail<G: GraphPort>(graph: G) {
        let err = graph.get_neighbors("Nobody", 1, None).await.unwrap_err();
        assert!(err.is_not_found());
    }

    pub async fn neighbor_type_filter<G: GraphPort>(mut graph: G) {
        link(
            &mut graph,
            &[("A", "B", Knows), ("A", "C", AlliedWith), ("B", "D", AlliedWith)],
        )
        .await;

        let allied = graph.get_neighbors("A", 2, Some(&[AlliedWith])).await.unwrap();
        let found: Vec<&str> = allied.iter().map(|n| n.entity.name.as_str()).collect();
        assert_eq!(found, vec!["C"]);

        assert!(graph.get_neighbors("A", 2, Some(&[])).await.unwrap().is_empty());
        assert!(graph.get_neighbors("A", 0, None).await.unwrap().is_empty());
    }

    pub async fn neighbor_ties_prefer_lowest_source<G: GraphPort>(mut graph: G) {
        // C -> D is inserted before B -> D
        link(&mut graph, &[("A", "C", Knows), ("A", "B", Knows), ("C", "D", Knows), ("B", "D", Knows)])
            .await;

        let neighbors = graph.get_neighbors("A", 2, None).await.unwrap();
        let d = neighbors.iter().find(|n| n.entity.name == "D").unwrap();
        assert_eq!(d.distance, 2);
        assert_eq!(d.relationship.source, "B");
    }

    pub async fn alice_bob_carol<G: GraphPort>(mut graph: G) {
        link(&mut graph, &[("Alice", "Bob", Knows), ("Bob", "Carol", Knows)]).await;

        let path = graph.find_path("Alice", "Carol", None).await.unwrap().unwrap();
        assert_eq!(path.entities, vec!["Alice", "Bob", "Carol"]);
        assert_eq!(path.length, 2);
        assert_eq!(path.relationships[0].target, "Bob");
        assert_eq!(path.relationships[1].source, "Bob");

        let neighbors = graph.get_neighbors("Alice", 2, None).await.unwrap();
        let reached: Vec<(&str, u32)> = neighbors
            .iter()
            .map(|n| (n.entity.name.as_str(), n.distance))
            .collect();
        assert_eq!(reached, vec![("Bob", 1), ("Carol", 2)]);
        assert_eq!(neighbors[1].relationship.source, "Bob");
    }

    // ========== Analytics ==========

    pub async fn stats_count_types<G: GraphPort>(mut graph: G) {
        graph.add_entity(&character("Alice")).await.unwrap();
        graph
            .add_entity(&Entity::new("Rivendell", EntityType::Location))
            .await
            .unwrap();
        link(&mut graph, &[("Alice", "Bob", Knows), ("Alice", "Bob", Loves), ("Bob", "Alice", Knows)]).await;

        let stats = graph.get_stats().await.unwrap();
        assert_eq!(stats.node_count, 3);
        assert_eq!(stats.edge_count, 3);
        assert_eq!(stats.entity_types[&EntityType::Character], 1);
        assert_eq!(stats.entity_types[&EntityType::Unknown], 1);
        assert_eq!(stats.relationship_types[&Knows], 2);
        assert_eq!(stats.relationship_types[&Loves], 1);
    }

    pub async fn cliques_of_triangle<G: GraphPort>(mut graph: G) {
        link(
            &mut graph,
            &[("Carol", "Alice", Knows), ("Alice", "Bob", Knows), ("Bob", "Carol", Knows), ("Carol", "Dave", Knows)],
        )
        .await;

        let result = graph.find_cliques(3, None, None).await.unwrap();
        assert_eq!(result.cliques, vec![vec!["Alice", "Bob", "Carol"]]);
        assert_eq!((result.largest_size, result.total_count), (3, 1));

        let pairs = graph.find_cliques(2, Some(2), None).await.unwrap();
        assert_eq!(pairs.cliques, vec![vec!["Carol", "Dave"]]);
    }

    // ========== Export ==========

    pub async fn export_json_round_trip<G: GraphPort>(mut graph: G) {
        graph
            .add_entity(&character("Alice").with_metadata("origin", "north"))
            .await
            .unwrap();
        link(&mut graph, &[("Alice", "Bob", Knows), ("Bob", "Carol", Loves)]).await;

        let result = graph.export_json(None, true).await.unwrap();
        let document = GraphDocument::parse(result.inline_content().unwrap()).unwrap();

        assert_eq!(document.nodes.len(), result.node_count);
        assert_eq!(document.edges.len(), result.edge_count);
        assert_eq!((result.node_count, result.edge_count), (3, 2));
        assert_eq!(document.nodes[0].metadata["origin"], "north");
    }

    pub async fn export_json_to_nested_file<G: GraphPort>(mut graph: G) {
        link(&mut graph, &[("Alice", "Bob", Knows)]).await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/graph.json");

        let result = graph.export_json(Some(&path), false).await.unwrap();
        assert_eq!(result.payload, ExportPayload::File(path.clone()));
        assert_eq!(result.size_bytes, std::fs::metadata(&path).unwrap().len());
    }

    pub async fn export_graphml_inline<G: GraphPort>(mut graph: G) {
        link(&mut graph, &[("Alice", "Bob", Knows)]).await;

        let result = graph.export_graphml(None, false).await.unwrap();
        let xml = result.inline_content().unwrap();
        assert!(xml.contains("<graphml"));
        assert!(xml.contains("edgedefault=\"directed\""));
        assert!(xml.contains("Alice"));
        assert_eq!(result.size_bytes, xml.len() as u64);
    }
}
