//! Citation propagation scoring
//!
//! Implements PageRank-inspired authority for papers based on the citation graph

mod graph;
mod pagerank;

pub use graph::{CitationGraph, NodeIndex};
pub use pagerank::{AuthorityScorer, AuthorityScores};
