//! Domain logic
//!
//! Extraction and context assembly are pure apart from graph reads; analysis
//! and graph building are the write path.

pub mod analysis;
pub mod context;
pub mod extraction;
pub mod graph;
