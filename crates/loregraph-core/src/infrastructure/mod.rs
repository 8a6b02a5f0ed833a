//! Infrastructure layer
//!
//! Contains the graph engines that implement the domain port.

pub mod graph;
