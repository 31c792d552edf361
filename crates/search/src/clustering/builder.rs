//! Builds clustering input from ranked candidates and regroups the result

use super::ClusteringEngine;
use crate::retrieval::ScoredCandidate;
use paperrank_common::errors::{AppError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Default K-Means iteration cap
pub const DEFAULT_MAX_ITERATIONS: u64 = 100;

/// A group of related candidates
#[derive(Debug, Clone, Serialize)]
pub struct Cluster {
    /// Engine-assigned cluster index
    pub index: usize,

    /// Members in ranking order
    pub papers: Vec<ScoredCandidate>,
}

/// Turns ranked candidates into clusters
#[derive(Debug, Clone)]
pub struct ClusterInputBuilder {
    max_iterations: u64,
}

impl Default for ClusterInputBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITERATIONS)
    }
}

impl ClusterInputBuilder {
    pub fn new(max_iterations: u64) -> Self {
        Self { max_iterations }
    }

    /// Feature vector of a candidate: its semantic vector followed by the
    /// combined score
    fn features(candidate: &ScoredCandidate) -> Vec<f64> {
        let vector = candidate.paper.usable_vector().unwrap_or(&[]);
        let mut features = Vec::with_capacity(vector.len() + 1);
        features.extend(vector.iter().map(|&v| v as f64));
        features.push(candidate.combined_score);
        features
    }

    /// Cluster the first `top_n` candidates into at most `num_clusters`
    /// groups, ordered by cluster index. Empty groups are omitted.
    pub fn build(
        &self,
        engine: &dyn ClusteringEngine,
        candidates: &[ScoredCandidate],
        top_n: usize,
        num_clusters: usize,
    ) -> Result<Vec<Cluster>> {
        if num_clusters == 0 {
            return Err(AppError::Validation {
                message: "number of clusters must be at least 1".to_string(),
            });
        }

        let selected = &candidates[..top_n.min(candidates.len())];
        if selected.is_empty() {
            return Ok(Vec::new());
        }

        let features: Vec<Vec<f64>> = selected.iter().map(Self::features).collect();
        let assignments = engine.partition(&features, num_clusters, self.max_iterations)?;

        if assignments.len() != selected.len() {
            return Err(AppError::Clustering {
                message: format!(
                    "{} returned {} assignments for {} candidates",
                    engine.name(),
                    assignments.len(),
                    selected.len()
                ),
            });
        }
        if let Some(&bad) = assignments.iter().find(|&&a| a >= num_clusters) {
            return Err(AppError::Clustering {
                message: format!(
                    "{} assigned cluster {} outside [0, {})",
                    engine.name(),
                    bad,
                    num_clusters
                ),
            });
        }

        let mut groups: BTreeMap<usize, Vec<ScoredCandidate>> = BTreeMap::new();
        for (candidate, cluster) in selected.iter().zip(assignments) {
            groups.entry(cluster).or_default().push(candidate.clone());
        }

        debug!(
            engine = engine.name(),
            candidates = selected.len(),
            clusters = groups.len(),
            "Candidates clustered"
        );

        Ok(groups
            .into_iter()
            .map(|(index, papers)| Cluster { index, papers })
            .collect())
    }
}
