//! Relationships for the narrative knowledge graph
//!
//! Relationships are directed, typed edges between entities. The graph is a
//! multigraph: an ordered pair may carry several relationships as long as
//! their types differ.

use serde::{Deserialize, Serialize};

use super::entity::{Metadata, canonicalize};

/// A directed relationship between two entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Display name of the source entity
    pub source: String,
    /// Display name of the target entity
    pub target: String,
    /// Type of relationship
    #[serde(rename = "type")]
    pub relationship_type: RelationshipType,
    /// Free-text context the relationship was observed in
    #[serde(default)]
    pub context: String,
    /// Strength of the relationship (0.0 to 1.0)
    #[serde(default = "default_strength")]
    pub strength: f64,
    /// Open metadata
    #[serde(default)]
    pub metadata: Metadata,
}

fn default_strength() -> f64 {
    1.0
}

impl Relationship {
    /// Create a new relationship
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relationship_type: RelationshipType,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relationship_type,
            context: String::new(),
            strength: default_strength(),
            metadata: Metadata::new(),
        }
    }

    /// Set the strength (clamped to 0.0-1.0)
    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength.clamp(0.0, 1.0);
        self
    }

    /// Set the context
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Identity key of this relationship
    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(&self.source, &self.target, self.relationship_type)
    }

    /// Describe why the relationship is invalid, if it is
    pub fn validation_error(&self) -> Option<&'static str> {
        if self.source.trim().is_empty() {
            Some("source must not be empty")
        } else if self.target.trim().is_empty() {
            Some("target must not be empty")
        } else if !(0.0..=1.0).contains(&self.strength) {
            Some("strength must be within [0, 1]")
        } else {
            None
        }
    }
}

/// Identity key of a relationship: canonical endpoints plus type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub source: String,
    pub target: String,
    pub relationship_type: RelationshipType,
}

impl EdgeKey {
    /// Build a key from display names
    pub fn new(source: &str, target: &str, relationship_type: RelationshipType) -> Self {
        Self {
            source: canonicalize(source),
            target: canonicalize(target),
            relationship_type,
        }
    }
}

/// Types of relationships between entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    Knows,
    Killed,
    Loves,
    Hates,
    ParentOf,
    ChildOf,
    MemberOf,
    Leads,
    Serves,
    Owns,
    LocatedAt,
    OccurredAt,
    ParticipatedIn,
    AlliedWith,
    EnemyOf,
    Mentored,
    Other,
}

impl RelationshipType {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Knows => "knows",
            Self::Killed => "killed",
            Self::Loves => "loves",
            Self::Hates => "hates",
            Self::ParentOf => "parent_of",
            Self::ChildOf => "child_of",
            Self::MemberOf => "member_of",
            Self::Leads => "leads",
            Self::Serves => "serves",
            Self::Owns => "owns",
            Self::LocatedAt => "located_at",
            Self::OccurredAt => "occurred_at",
            Self::ParticipatedIn => "participated_in",
            Self::AlliedWith => "allied_with",
            Self::EnemyOf => "enemy_of",
            Self::Mentored => "mentored",
            Self::Other => "other",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "knows" => Some(Self::Knows),
            "killed" => Some(Self::Killed),
            "loves" => Some(Self::Loves),
            "hates" => Some(Self::Hates),
            "parent_of" | "parentof" => Some(Self::ParentOf),
            "child_of" | "childof" => Some(Self::ChildOf),
            "member_of" | "memberof" => Some(Self::MemberOf),
            "leads" => Some(Self::Leads),
            "serves" => Some(Self::Serves),
            "owns" => Some(Self::Owns),
            "located_at" | "locatedat" => Some(Self::LocatedAt),
            "occurred_at" | "occurredat" => Some(Self::OccurredAt),
            "participated_in" | "participatedin" => Some(Self::ParticipatedIn),
            "allied_with" | "alliedwith" => Some(Self::AlliedWith),
            "enemy_of" | "enemyof" => Some(Self::EnemyOf),
            "mentored" => Some(Self::Mentored),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    /// Get all relationship types
    pub fn all() -> &'static [RelationshipType] {
        &[
            Self::Knows,
            Self::Killed,
            Self::Loves,
            Self::Hates,
            Self::ParentOf,
            Self::ChildOf,
            Self::MemberOf,
            Self::Leads,
            Self::Serves,
            Self::Owns,
            Self::LocatedAt,
            Self::OccurredAt,
            Self::ParticipatedIn,
            Self::AlliedWith,
            Self::EnemyOf,
            Self::Mentored,
            Self::Other,
        ]
    }
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
