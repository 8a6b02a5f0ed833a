//! Reasoning traces for explain-mode enrichment

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::graph::Metadata;

/// Kind of work an explanation step records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    EntityExtraction,
    EntityLookup,
    RelationshipTraversal,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EntityExtraction => "entity_extraction",
            Self::EntityLookup => "entity_lookup",
            Self::RelationshipTraversal => "relationship_traversal",
        }
    }

    pub fn all() -> [StepType; 3] {
        [
            Self::EntityExtraction,
            Self::EntityLookup,
            Self::RelationshipTraversal,
        ]
    }
}

impl std::fmt::Display for StepType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded step. Steps are never modified once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationStep {
    /// 1-based position in the trace, assigned on record
    pub step_number: usize,
    pub step_type: StepType,
    pub description: String,
    pub primary_entity: Option<String>,
    pub related_entities: Vec<String>,
    pub relevance_score: f64,
    pub metadata: Metadata,
}

impl ExplanationStep {
    pub fn new(step_type: StepType, description: impl Into<String>) -> Self {
        Self {
            step_number: 0,
            step_type,
            description: description.into(),
            primary_entity: None,
            related_entities: Vec::new(),
            relevance_score: 0.0,
            metadata: Metadata::new(),
        }
    }

    pub fn with_primary(mut self, entity: impl Into<String>) -> Self {
        self.primary_entity = Some(entity.into());
        self
    }

    pub fn with_related(mut self, entities: Vec<String>) -> Self {
        self.related_entities = entities;
        self
    }

    pub fn with_relevance(mut self, score: f64) -> Self {
        self.relevance_score = score.clamp(0.0, 1.0);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Finished explanation attached to an enrichment result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningExplanation {
    pub steps: Vec<ExplanationStep>,
    pub entities_examined: usize,
    pub relationships_examined: usize,
    pub max_depth_reached: u32,
    pub summary: String,
}

impl ReasoningExplanation {
    pub fn steps_of(&self, step_type: StepType) -> impl Iterator<Item = &ExplanationStep> {
        self.steps.iter().filter(move |s| s.step_type == step_type)
    }
}

/// Append-only step recorder
#[derive(Debug, Default)]
pub struct ReasoningTrace {
    steps: Vec<ExplanationStep>,
    examined: BTreeSet<String>,
    found: Vec<String>,
    relationships_examined: usize,
    max_depth_reached: u32,
}

impl ReasoningTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, mut step: ExplanationStep) {
        step.step_number = self.steps.len() + 1;
        if let Some(primary) = &step.primary_entity {
            self.examined.insert(primary.to_lowercase());
        }
        if step.step_type == StepType::RelationshipTraversal {
            for related in &step.related_entities {
                self.examined.insert(related.to_lowercase());
            }
        }
        self.steps.push(step);
    }

    /// Note an entity that resolved in the graph
    pub fn found(&mut self, name: &str) {
        if !self.found.iter().any(|f| f == name) {
            self.found.push(name.to_string());
        }
    }

    pub fn traversed(&mut self, relationships: usize, depth: u32) {
        self.relationships_examined += relationships;
        self.max_depth_reached = self.max_depth_reached.max(depth);
    }

    pub fn finish(self) -> ReasoningExplanation {
        let summary = self.summary();
        ReasoningExplanation {
            steps: self.steps,
            entities_examined: self.examined.len(),
            relationships_examined: self.relationships_examined,
            max_depth_reached: self.max_depth_reached,
            summary,
        }
    }

    /// Step count, per-type counts, then the entities found
    fn summary(&self) -> String {
        let mut lines = vec![format!("Reasoning trace: {} steps", self.steps.len())];
        for step_type in StepType::all() {
            let count = self.steps.iter().filter(|s| s.step_type == step_type).count();
            lines.push(format!("  {}: {}", step_type, count));
        }
        if self.found.is_empty() {
            lines.push("Entities found: none".to_string());
        } else {
            lines.push(format!("Entities found: {}", self.found.join(", ")));
        }
        lines.join("\n")
    }
}
