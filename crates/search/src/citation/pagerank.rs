//! PageRank-based authority scoring
//!
//! Runs a fixed number of propagation rounds over the citation graph.
//! Each round reads only the previous round's scores.

use super::CitationGraph;
use paperrank_common::config::AuthorityConfig;
use std::time::Instant;
use tracing::{debug, info};

/// Authority scores for every node, before scaling
#[derive(Debug, Clone, Default)]
pub struct AuthorityScores {
    scores: Vec<f64>,

    /// Rounds actually run
    pub rounds: usize,

    /// L1 change of the last round
    pub last_delta: f64,
}

impl AuthorityScores {
    /// Unscaled score of a node
    pub fn get(&self, node: usize) -> Option<f64> {
        self.scores.get(node).copied()
    }

    /// Unscaled scores in node order
    pub fn as_slice(&self) -> &[f64] {
        &self.scores
    }

    /// Sum of all unscaled scores
    pub fn total_mass(&self) -> f64 {
        self.scores.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Scores multiplied by `scale`, in node order
    pub fn scaled(&self, scale: f64) -> impl Iterator<Item = f64> + '_ {
        self.scores.iter().map(move |score| score * scale)
    }
}

/// PageRank scorer for papers
pub struct AuthorityScorer {
    config: AuthorityConfig,
}

impl AuthorityScorer {
    /// Create a new scorer
    pub fn new(config: AuthorityConfig) -> Self {
        Self { config }
    }

    /// Compute authority for every node in the graph
    pub fn compute(&self, graph: &CitationGraph) -> AuthorityScores {
        let n = graph.node_count();
        if n == 0 {
            return AuthorityScores::default();
        }

        let started = Instant::now();
        let n_f64 = n as f64;
        let damping = self.config.damping;
        let teleport = (1.0 - damping) / n_f64;

        let mut scores = vec![1.0 / n_f64; n];
        let mut rounds = 0;
        let mut last_delta = 0.0;

        for round in 0..self.config.rounds {
            let leaked = if self.config.redistribute_leaked_mass {
                Self::leaked_mass(graph, &scores)
            } else {
                0.0
            };
            let uniform = teleport + damping * leaked / n_f64;

            let new_scores: Vec<f64> = (0..n)
                .map(|node| {
                    // Sum contributions from papers citing this one
                    let inbound: f64 = graph
                        .citations(node)
                        .iter()
                        .map(|&citing| scores[citing] / graph.out_degree(citing) as f64)
                        .sum();
                    uniform + damping * inbound
                })
                .collect();

            last_delta = new_scores
                .iter()
                .zip(&scores)
                .map(|(new, old)| (new - old).abs())
                .sum();
            scores = new_scores;
            rounds = round + 1;

            debug!(round = rounds, delta = last_delta, "Authority round complete");

            // Check convergence
            if let Some(epsilon) = self.config.convergence_epsilon {
                if last_delta < epsilon {
                    break;
                }
            }
        }

        let elapsed = started.elapsed();
        paperrank_common::metrics::record_authority(elapsed.as_secs_f64(), rounds);
        info!(
            papers = n,
            edges = graph.edge_count(),
            rounds,
            delta = last_delta,
            elapsed_ms = elapsed.as_millis() as u64,
            "Authority scores computed"
        );

        AuthorityScores {
            scores,
            rounds,
            last_delta,
        }
    }

    /// Mass that the citation edges do not carry to any corpus paper:
    /// everything held by papers citing nobody, plus the share each paper
    /// sends to ids outside the corpus.
    fn leaked_mass(graph: &CitationGraph, scores: &[f64]) -> f64 {
        scores
            .iter()
            .enumerate()
            .map(|(node, &score)| {
                let degree = graph.out_degree(node);
                if degree == 0 {
                    return score;
                }
                let resolved = graph.reference_count(node);
                score * (degree - resolved) as f64 / degree as f64
            })
            .sum()
    }
}
