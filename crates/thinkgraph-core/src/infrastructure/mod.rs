//! Infrastructure layer
//!
//! Contains implementations of the domain traits over external systems.

pub mod graph;
