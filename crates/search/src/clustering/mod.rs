//! Result clustering
//!
//! Groups the top ranked candidates by semantic similarity so related papers
//! are reported together.

mod builder;
mod kmeans;

pub use builder::{Cluster, ClusterInputBuilder};
pub use kmeans::KMeansEngine;

use paperrank_common::errors::Result;

/// Partitions feature vectors into clusters
pub trait ClusteringEngine: Send + Sync {
    /// Cluster index in `[0, k)` for every vector, in input order
    fn partition(&self, vectors: &[Vec<f64>], k: usize, max_iterations: u64) -> Result<Vec<usize>>;

    /// Get the name of this engine
    fn name(&self) -> &str;
}
