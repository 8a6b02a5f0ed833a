//! Import of typed extraction output into the graph
//!
//! Extractors (LLM or otherwise) emit loosely typed records: type names are
//! free strings and confidence is a plain score. This module maps them onto
//! graph entities and relationships and loads them through the port.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::graph::{AddResult, Entity, EntityType, GraphPort, Relationship, RelationshipType};
use crate::error::Result;

/// Metadata key holding the extractor's confidence
pub const CONFIDENCE_KEY: &str = "confidence";

/// An entity as emitted by an extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub name: String,
    #[serde(rename = "type", default)]
    pub entity_type: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

/// A relationship as emitted by an extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRelationship {
    pub source: String,
    pub target: String,
    #[serde(rename = "type", default)]
    pub relationship_type: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub strength: Option<f64>,
}

fn default_confidence() -> f64 {
    1.0
}

impl ExtractedEntity {
    /// Map onto a graph entity; unrecognized types become `unknown`
    pub fn to_entity(&self) -> Entity {
        let entity_type = EntityType::parse(&self.entity_type).unwrap_or(EntityType::Unknown);
        let mut entity = Entity::new(self.name.trim(), entity_type)
            .with_aliases(self.aliases.iter().cloned())
            .with_metadata(CONFIDENCE_KEY, self.confidence.clamp(0.0, 1.0));
        if let Some(description) = &self.description {
            entity = entity.with_description(description.as_str());
        }
        entity
    }
}

impl ExtractedRelationship {
    /// Map onto a graph relationship; unrecognized types become `other`
    pub fn to_relationship(&self) -> Relationship {
        let relationship_type =
            RelationshipType::parse(&self.relationship_type).unwrap_or(RelationshipType::Other);
        let mut relationship =
            Relationship::new(self.source.trim(), self.target.trim(), relationship_type);
        // unclamped, so an out-of-range score fails validation on add
        if let Some(strength) = self.strength {
            relationship.strength = strength;
        }
        if let Some(context) = &self.context {
            relationship = relationship.with_context(context.as_str());
        }
        relationship
    }
}

/// Output of one extraction run, as stored in import files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionBatch {
    #[serde(default)]
    pub entities: Vec<ExtractedEntity>,
    #[serde(default)]
    pub relationships: Vec<ExtractedRelationship>,
}

impl ExtractionBatch {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relationships.is_empty()
    }
}

/// Outcome of an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub entities: AddResult,
    pub relationships: AddResult,
}

/// Load a batch into the graph: entities first, then relationships
///
/// Relationships may reference entities the batch never declared; those
/// endpoints become placeholders.
pub async fn import_extraction<P>(port: &mut P, batch: &ExtractionBatch) -> Result<ImportReport>
where
    P: GraphPort + ?Sized,
{
    let entities: Vec<Entity> = batch.entities.iter().map(ExtractedEntity::to_entity).collect();
    let relationships: Vec<Relationship> = batch
        .relationships
        .iter()
        .map(ExtractedRelationship::to_relationship)
        .collect();

    let report = ImportReport {
        entities: port.add_entities(&entities).await?,
        relationships: port.add_relationships(&relationships).await?,
    };

    info!(
        entities_added = report.entities.added,
        entities_existing = report.entities.existing,
        relationships_added = report.relationships.added,
        relationships_existing = report.relationships.existing,
        failed = report.entities.failed + report.relationships.failed,
        "Imported extraction batch"
    );

    Ok(report)
}
