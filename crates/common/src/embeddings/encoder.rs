//! Text to vector encoding over an embedding table

use super::EmbeddingTable;
use std::sync::Arc;

/// Turns free text into a fixed-width vector by averaging word embeddings.
#[derive(Clone)]
pub struct SemanticEncoder {
    table: Arc<dyn EmbeddingTable>,
}

impl SemanticEncoder {
    pub fn new(table: Arc<dyn EmbeddingTable>) -> Self {
        Self { table }
    }

    /// Width of every encoded vector
    pub fn dimension(&self) -> usize {
        self.table.dimensionality()
    }

    /// Encode text as the mean of its resolvable token vectors.
    ///
    /// Tokens are the lower-cased, whitespace-separated words of `text`.
    /// Returns a zero vector when no token is in the table.
    pub fn encode(&self, text: &str) -> Vec<f32> {
        let dimension = self.dimension();
        let mut sum = vec![0.0f32; dimension];
        let mut resolved = 0usize;

        for token in text.to_lowercase().split_whitespace() {
            if let Some(vector) = self.table.lookup(token) {
                for (acc, value) in sum.iter_mut().zip(vector) {
                    *acc += *value;
                }
                resolved += 1;
            }
        }

        if resolved > 1 {
            let count = resolved as f32;
            for value in &mut sum {
                *value /= count;
            }
        }

        sum
    }
}

impl std::fmt::Debug for SemanticEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticEncoder")
            .field("dimension", &self.dimension())
            .field("vocabulary_size", &self.table.vocabulary_size())
            .finish()
    }
}

/// Cosine similarity of two vectors.
///
/// Zero-magnitude inputs and width mismatches score 0 instead of NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}
