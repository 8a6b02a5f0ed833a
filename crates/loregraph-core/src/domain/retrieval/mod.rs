//! Graph-augmented retrieval
//!
//! Fuses vector-search chunks with knowledge graph context:
//!
//! - `detector`: Entity name detection behind a pluggable trait
//! - `service`: Chunk enrichment and standalone graph queries
//! - `explain`: Reasoning traces for explain mode

pub mod detector;
pub mod explain;
pub mod service;

pub use detector::{EntityNameDetector, HeuristicNameDetector};
pub use explain::{ExplanationStep, ReasoningExplanation, ReasoningTrace, StepType};
pub use service::{
    CacheStats, EnrichedChunk, EnrichmentResult, EntityContext, GraphRetrievalService,
    RetrievalConfig, RetrievedChunk,
};
