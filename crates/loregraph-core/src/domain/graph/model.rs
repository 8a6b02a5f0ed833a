//! Value types returned by graph operations

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityType};
use super::relationship::{Relationship, RelationshipType};

/// An entity reached from a query entity during traversal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// The entity reached
    pub entity: Entity,
    /// Relationship through which it was reached
    pub relationship: Relationship,
    /// Number of hops from the query entity (at least 1)
    pub distance: u32,
}

/// A path between two entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    /// Display names of the entities along the path, endpoints included
    pub entities: Vec<String>,
    /// Relationships connecting consecutive entities
    pub relationships: Vec<Relationship>,
    /// Number of edges
    pub length: usize,
}

impl Path {
    /// Zero-length path from an entity to itself
    pub fn trivial(name: impl Into<String>) -> Self {
        Self {
            entities: vec![name.into()],
            relationships: Vec::new(),
            length: 0,
        }
    }

    /// Build a path from its entities and connecting relationships
    pub fn new(entities: Vec<String>, relationships: Vec<Relationship>) -> Self {
        let length = relationships.len();
        Self {
            entities,
            relationships,
            length,
        }
    }
}

/// Statistics about the graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    /// Total number of entities
    pub node_count: usize,
    /// Total number of relationships
    pub edge_count: usize,
    /// Entities by type
    pub entity_types: BTreeMap<EntityType, usize>,
    /// Relationships by type
    pub relationship_types: BTreeMap<RelationshipType, usize>,
}

/// Outcome of a batch add
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddResult {
    /// Items newly inserted
    pub added: usize,
    /// Items already present
    pub existing: usize,
    /// Items rejected; never aborts the batch
    pub failed: usize,
}

impl AddResult {
    /// Record the outcome of one item
    pub fn record(&mut self, added: bool) {
        if added {
            self.added += 1;
        } else {
            self.existing += 1;
        }
    }

    /// Total number of items processed
    pub fn total(&self) -> usize {
        self.added + self.existing + self.failed
    }
}

/// Maximal cliques found in the graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliqueResult {
    /// Cliques as display names, largest first
    pub cliques: Vec<Vec<String>>,
    /// Size of the largest clique returned
    pub largest_size: usize,
    /// Number of cliques returned
    pub total_count: usize,
}

/// Centrality scores for one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentralityResult {
    /// Display name of the entity
    pub entity: String,
    pub degree: f64,
    pub betweenness: f64,
    pub closeness: f64,
    pub pagerank: f64,
}

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Graphml,
}

impl ExportFormat {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Graphml => "graphml",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "graphml" | "xml" => Some(Self::Graphml),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where the exported content ended up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportPayload {
    /// Content returned inline
    Inline(String),
    /// Content written to a file
    File(PathBuf),
}

/// Outcome of an export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportResult {
    pub format: ExportFormat,
    pub node_count: usize,
    pub edge_count: usize,
    pub payload: ExportPayload,
    /// Size of the exported content in bytes
    pub size_bytes: u64,
}

impl ExportResult {
    /// Inline content, if the export was not written to a file
    pub fn inline_content(&self) -> Option<&str> {
        match &self.payload {
            ExportPayload::Inline(content) => Some(content),
            ExportPayload::File(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trivial_path() {
        let path = Path::trivial("Alice");
        assert_eq!(path.length, 0);
        assert_eq!(path.entities, vec!["Alice"]);
        assert!(path.relationships.is_empty());
    }

    #[test]
    fn test_path_length_counts_edges() {
        let path = Path::new(
            vec!["A".into(), "B".into(), "C".into()],
            vec![
                Relationship::new("A", "B", RelationshipType::Knows),
                Relationship::new("B", "C", RelationshipType::Knows),
            ],
        );
        assert_eq!(path.length, 2);
    }

    #[test]
    fn test_add_result_record() {
        let mut result = AddResult::default();
        result.record(true);
        result.record(false);
        result.record(true);
        result.failed += 1;
        assert_eq!(result.added, 2);
        assert_eq!(result.existing, 1);
        assert_eq!(result.total(), 4);
    }

    #[test]
    fn test_export_format_parsing() {
        assert_eq!(ExportFormat::parse("JSON"), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::parse("graphml"), Some(ExportFormat::Graphml));
        assert_eq!(ExportFormat::parse("csv"), None);
    }
}
