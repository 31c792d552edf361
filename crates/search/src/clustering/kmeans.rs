//! K-Means engine backed by linfa

use super::ClusteringEngine;
use linfa::dataset::AsTargets;
use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use linfa_clustering::KMeans;
use ndarray::Array2;
use paperrank_common::errors::{AppError, Result};
use std::collections::HashSet;
use tracing::debug;

/// K-Means++ clustering with a fixed seed, so equal inputs give equal output
#[derive(Debug, Clone)]
pub struct KMeansEngine {
    tolerance: f64,
}

impl KMeansEngine {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }
}

impl Default for KMeansEngine {
    fn default() -> Self {
        Self::new(1e-4)
    }
}

/// Number of distinct rows, comparing values bit for bit
fn distinct_points(vectors: &[Vec<f64>]) -> usize {
    vectors
        .iter()
        .map(|row| row.iter().map(|v| v.to_bits()).collect::<Vec<u64>>())
        .collect::<HashSet<_>>()
        .len()
}

impl ClusteringEngine for KMeansEngine {
    fn partition(&self, vectors: &[Vec<f64>], k: usize, max_iterations: u64) -> Result<Vec<usize>> {
        if k == 0 {
            return Err(AppError::Validation {
                message: "number of clusters must be at least 1".to_string(),
            });
        }
        if vectors.is_empty() {
            return Ok(Vec::new());
        }

        let dimension = vectors[0].len();
        if vectors.iter().any(|row| row.len() != dimension) {
            return Err(AppError::Clustering {
                message: "feature vectors have different lengths".to_string(),
            });
        }
        if vectors.iter().flatten().any(|v| !v.is_finite()) {
            return Err(AppError::Clustering {
                message: "feature vectors contain non-finite values".to_string(),
            });
        }

        // K-Means cannot place more centroids than there are distinct points
        let k = k.min(distinct_points(vectors));
        if k <= 1 {
            return Ok(vec![0; vectors.len()]);
        }

        let mut data = Array2::zeros((vectors.len(), dimension));
        for (i, row) in vectors.iter().enumerate() {
            for (j, &value) in row.iter().enumerate() {
                data[[i, j]] = value;
            }
        }

        let dataset = DatasetBase::from(data);
        let model = KMeans::params(k)
            .max_n_iterations(max_iterations)
            .tolerance(self.tolerance)
            .fit(&dataset)
            .map_err(|e| AppError::Clustering {
                message: format!("K-Means fit failed: {}", e),
            })?;

        let predictions = model.predict(&dataset);
        let labels: Vec<usize> = predictions.as_targets().iter().copied().collect();

        debug!(points = vectors.len(), k, "K-Means partition complete");
        Ok(labels)
    }

    fn name(&self) -> &str {
        "kmeans"
    }
}
