//! Lexical retrieval and score fusion
//!
//! - A tantivy text index answers keyword queries with BM25 scores
//! - Fusion blends the lexical score with semantic similarity and authority

mod bm25;
mod fusion;

pub use bm25::Bm25Index;
pub use fusion::{
    FusionWeights, ScoreFusion, ScoredCandidate, DEFAULT_AUTHORITY_WEIGHT, DEFAULT_LEXICAL_WEIGHT,
    DEFAULT_OVER_FETCH, DEFAULT_SEMANTIC_WEIGHT,
};

use paperrank_common::errors::Result;
use paperrank_common::models::{Paper, PaperId};
use serde::{Deserialize, Serialize};

/// A document matched by the text index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexicalHit {
    /// Paper id of the matching document
    pub id: PaperId,

    /// Relevance score, higher is better
    pub score: f64,
}

/// Fields handed to the text index for one paper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub id: PaperId,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub authors: String,
    pub year: String,
    pub venue: String,
}

impl IndexDocument {
    /// Index view of a paper. Papers without an id cannot be returned as
    /// hits and are not indexed.
    pub fn from_paper(paper: &Paper) -> Option<Self> {
        let id = paper.id()?;
        Some(Self {
            id: id.to_string(),
            title: paper.title.clone(),
            abstract_text: paper.abstract_or_empty().to_string(),
            authors: paper.authors.clone(),
            year: paper.year.clone(),
            venue: paper.venue.clone(),
        })
    }
}

/// Keyword index over the corpus
pub trait TextIndex: Send + Sync {
    /// Up to `limit` hits for `query`, best first
    fn search(&self, query: &str, limit: usize) -> Result<Vec<LexicalHit>>;

    /// Number of indexed documents
    fn document_count(&self) -> usize;
}
