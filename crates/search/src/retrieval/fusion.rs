//! Weighted score fusion
//!
//! Blends three signals into one ranking score:
//! - BM25 relevance from the text index
//! - cosine similarity between query and paper title embeddings
//! - citation authority, brought back to its unscaled magnitude

use super::LexicalHit;
use paperrank_common::config::FusionConfig;
use paperrank_common::embeddings::cosine_similarity;
use paperrank_common::models::Paper;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Weight of the BM25 score
pub const DEFAULT_LEXICAL_WEIGHT: f64 = 0.5;

/// Weight of the cosine similarity
pub const DEFAULT_SEMANTIC_WEIGHT: f64 = 0.2;

/// Weight of the descaled authority score
pub const DEFAULT_AUTHORITY_WEIGHT: f64 = 0.3;

/// Lexical hits fetched per requested result
pub const DEFAULT_OVER_FETCH: usize = 10;

/// Fusion weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub lexical: f64,
    pub semantic: f64,
    pub authority: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            lexical: DEFAULT_LEXICAL_WEIGHT,
            semantic: DEFAULT_SEMANTIC_WEIGHT,
            authority: DEFAULT_AUTHORITY_WEIGHT,
        }
    }
}

/// A paper with its component and combined scores
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    pub paper: Arc<Paper>,
    pub lexical_score: f64,
    pub semantic_score: f64,
    /// Scaled authority as stored on the paper
    pub authority_score: f64,
    pub combined_score: f64,
}

/// Score fusion
#[derive(Debug, Clone)]
pub struct ScoreFusion {
    pub weights: FusionWeights,

    /// Divisor turning the stored authority back into its raw magnitude
    pub authority_scale: f64,

    pub over_fetch: usize,
}

impl Default for ScoreFusion {
    fn default() -> Self {
        Self {
            weights: FusionWeights::default(),
            authority_scale: paperrank_common::AUTHORITY_SCALE,
            over_fetch: DEFAULT_OVER_FETCH,
        }
    }
}

impl ScoreFusion {
    pub fn from_config(config: &FusionConfig, authority_scale: f64) -> Self {
        Self {
            weights: FusionWeights {
                lexical: config.lexical_weight,
                semantic: config.semantic_weight,
                authority: config.authority_weight,
            },
            authority_scale,
            over_fetch: config.over_fetch,
        }
    }

    /// Number of lexical hits to request for `top_n` results
    pub fn candidate_limit(&self, top_n: usize) -> usize {
        top_n.saturating_mul(self.over_fetch)
    }

    /// Combined score from the three components
    pub fn combine(&self, lexical: f64, semantic: f64, authority: f64) -> f64 {
        self.weights.lexical * lexical
            + self.weights.semantic * semantic
            + self.weights.authority * (authority / self.authority_scale)
    }

    /// Score lexical hits and sort them best first.
    ///
    /// Hits whose paper cannot be resolved or has no usable semantic vector
    /// are dropped. Equal scores keep their lexical order.
    pub fn fuse<F>(&self, hits: Vec<LexicalHit>, query_vector: &[f32], lookup: F) -> Vec<ScoredCandidate>
    where
        F: Fn(&str) -> Option<Arc<Paper>>,
    {
        let mut dropped = 0usize;

        let mut candidates: Vec<ScoredCandidate> = hits
            .into_iter()
            .filter_map(|hit| {
                let paper = lookup(&hit.id);
                let Some(vector) = paper.as_deref().and_then(Paper::usable_vector) else {
                    dropped += 1;
                    return None;
                };
                let semantic = cosine_similarity(query_vector, vector);
                let paper = paper?;
                let authority = paper.authority_score;

                Some(ScoredCandidate {
                    combined_score: self.combine(hit.score, semantic, authority),
                    lexical_score: hit.score,
                    semantic_score: semantic,
                    authority_score: authority,
                    paper,
                })
            })
            .collect();

        if dropped > 0 {
            debug!(dropped, "Skipped hits without a semantic vector");
        }

        candidates.sort_by(|a, b| b.combined_score.total_cmp(&a.combined_score));
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn paper(id: &str, vector: Option<Vec<f32>>, authority: f64) -> Arc<Paper> {
        let mut paper = Paper::new(format!("Paper {id}")).with_id(id);
        paper.semantic_vector = vector;
        paper.authority_score = authority;
        Arc::new(paper)
    }

    fn hit(id: &str, score: f64) -> LexicalHit {
        LexicalHit {
            id: id.to_string(),
            score,
        }
    }

    fn lookup(papers: Vec<Arc<Paper>>) -> impl Fn(&str) -> Option<Arc<Paper>> {
        let by_id: HashMap<String, Arc<Paper>> = papers
            .into_iter()
            .map(|p| (p.id().unwrap_or_default().to_string(), p))
            .collect();
        move |id: &str| by_id.get(id).cloned()
    }

    #[test]
    fn test_combine_formula() {
        let fusion = ScoreFusion::default();
        let combined = fusion.combine(2.0, 0.5, 50_000.0);
        assert!((combined - (1.0 + 0.1 + 0.15)).abs() < 1e-12);
    }

    #[test]
    fn test_authority_breaks_lexical_tie() {
        let fusion = ScoreFusion::default();
        let papers = vec![
            paper("low", Some(vec![1.0, 0.0]), 1_000.0),
            paper("high", Some(vec![1.0, 0.0]), 90_000.0),
        ];

        let ranked = fusion.fuse(
            vec![hit("low", 1.0), hit("high", 1.0)],
            &[1.0, 0.0],
            lookup(papers),
        );

        assert_eq!(ranked[0].paper.id(), Some("high"));
        assert!(ranked[0].combined_score > ranked[1].combined_score);
        assert!((ranked[0].semantic_score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_sorted_descending() {
        let fusion = ScoreFusion::default();
        let papers = vec![
            paper("a", Some(vec![0.0, 1.0]), 0.0),
            paper("b", Some(vec![1.0, 0.0]), 0.0),
            paper("c", Some(vec![1.0, 1.0]), 0.0),
        ];

        let ranked = fusion.fuse(
            vec![hit("a", 0.1), hit("b", 3.0), hit("c", 1.0)],
            &[1.0, 0.0],
            lookup(papers),
        );

        let ids: Vec<_> = ranked.iter().filter_map(|c| c.paper.id()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert!(ranked
            .windows(2)
            .all(|w| w[0].combined_score >= w[1].combined_score));
    }

    #[test]
    fn test_equal_scores_keep_lexical_order() {
        let fusion = ScoreFusion::default();
        let papers = vec![
            paper("x", Some(vec![1.0]), 0.0),
            paper("y", Some(vec![1.0]), 0.0),
            paper("z", Some(vec![1.0]), 0.0),
        ];

        let ranked = fusion.fuse(
            vec![hit("y", 1.0), hit("x", 1.0), hit("z", 1.0)],
            &[1.0],
            lookup(papers),
        );

        let ids: Vec<_> = ranked.iter().filter_map(|c| c.paper.id()).collect();
        assert_eq!(ids, vec!["y", "x", "z"]);
    }

    #[test]
    fn test_drops_papers_without_vectors() {
        let fusion = ScoreFusion::default();
        let papers = vec![
            paper("none", None, 0.0),
            paper("empty", Some(vec![]), 0.0),
            paper("ok", Some(vec![1.0]), 0.0),
        ];

        let ranked = fusion.fuse(
            vec![hit("none", 5.0), hit("empty", 4.0), hit("ok", 1.0), hit("unknown", 9.0)],
            &[1.0],
            lookup(papers),
        );

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].paper.id(), Some("ok"));
    }

    #[test]
    fn test_zero_query_vector() {
        let fusion = ScoreFusion::default();
        let ranked = fusion.fuse(
            vec![hit("a", 1.0)],
            &[0.0, 0.0],
            lookup(vec![paper("a", Some(vec![1.0, 0.0]), 0.0)]),
        );
        assert_eq!(ranked[0].semantic_score, 0.0);
        assert!((ranked[0].combined_score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_candidate_limit() {
        let fusion = ScoreFusion::default();
        assert_eq!(fusion.candidate_limit(20), 200);
        assert_eq!(fusion.candidate_limit(0), 0);
        assert_eq!(fusion.candidate_limit(usize::MAX), usize::MAX);
    }

    #[test]
    fn test_custom_weights() {
        let config = FusionConfig {
            lexical_weight: 1.0,
            semantic_weight: 0.0,
            authority_weight: 0.0,
            over_fetch: 3,
        };
        let fusion = ScoreFusion::from_config(&config, 100_000.0);
        assert_eq!(fusion.combine(2.0, 1.0, 99_999.0), 2.0);
        assert_eq!(fusion.candidate_limit(4), 12);
    }
}
