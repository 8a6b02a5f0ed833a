//! Entity types for the narrative knowledge graph
//!
//! Entities are the nodes of the graph: characters, locations, items,
//! events and organizations extracted from narrative text. Identity is
//! the canonical form of the display name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Open key-value bag attached to entities and relationships
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// A node in the knowledge graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Display form of the name
    pub name: String,
    /// Kind of entity
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    /// Alternate names, in the order they were recorded
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// Open metadata
    #[serde(default)]
    pub metadata: Metadata,
}

impl Entity {
    /// Create a new entity
    pub fn new(name: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            name: name.into(),
            entity_type,
            aliases: Vec::new(),
            description: String::new(),
            metadata: Metadata::new(),
        }
    }

    /// Create a placeholder for an endpoint referenced before it was stored
    pub fn placeholder(name: impl Into<String>) -> Self {
        Self::new(name, EntityType::Unknown)
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set aliases
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Canonical identity key of this entity
    pub fn canonical_name(&self) -> String {
        canonicalize(&self.name)
    }

    /// Whether the name is usable as an identity
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// Canonicalize a display name into its storage identity
///
/// Trims surrounding whitespace and lower-cases; inner spacing is kept.
pub fn canonicalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Types of entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Character,
    Location,
    Item,
    Event,
    Organization,
    /// Placeholder created when a relationship references a missing entity
    Unknown,
}

impl EntityType {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Character => "character",
            Self::Location => "location",
            Self::Item => "item",
            Self::Event => "event",
            Self::Organization => "organization",
            Self::Unknown => "unknown",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "character" | "person" | "char" => Some(Self::Character),
            "location" | "place" => Some(Self::Location),
            "item" | "object" => Some(Self::Item),
            "event" => Some(Self::Event),
            "organization" | "organisation" | "faction" | "org" => Some(Self::Organization),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Get all entity types
    pub fn all() -> &'static [EntityType] {
        &[
            Self::Character,
            Self::Location,
            Self::Item,
            Self::Event,
            Self::Organization,
            Self::Unknown,
        ]
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
