//! Domain layer
//!
//! Contains the graph model, the port engines implement, and the services
//! built on top of the port.

pub mod graph;
pub mod import;
pub mod retrieval;
