//! Word embedding abstraction
//!
//! Provides:
//! - The `EmbeddingTable` trait (token -> fixed-width vector)
//! - A word2vec-format table loaded once at startup
//! - The semantic encoder that averages token vectors into text vectors

mod encoder;
mod word2vec;

pub use encoder::{cosine_similarity, SemanticEncoder};
pub use word2vec::{EmbeddingFormat, LoadOptions, Word2VecTable};

/// Read-only lookup from token to embedding vector.
///
/// Implementations are loaded once and shared across concurrent queries.
pub trait EmbeddingTable: Send + Sync {
    /// Width of every vector returned by `lookup`
    fn dimensionality(&self) -> usize;

    /// Vector for an exact token, if the table has one
    fn lookup(&self, token: &str) -> Option<&[f32]>;

    /// Number of tokens in the table
    fn vocabulary_size(&self) -> usize;
}
