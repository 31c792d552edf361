//! PaperRank Search
//!
//! Ranks papers from a citation corpus against a free-text query and groups
//! the best results into topical clusters:
//! - Citation authority (PageRank over the citation graph)
//! - BM25 lexical retrieval over a tantivy index
//! - Weighted fusion of lexical, semantic and authority scores
//! - K-Means clustering of the top candidates

pub mod citation;
pub mod clustering;
pub mod engine;
pub mod report;
pub mod retrieval;

pub use clustering::{Cluster, ClusteringEngine, KMeansEngine};
pub use engine::{Corpus, SearchEngine};
pub use retrieval::{Bm25Index, LexicalHit, ScoredCandidate, TextIndex};
