//! PaperRank Common Library
//!
//! Shared code for the PaperRank crates including:
//! - The paper model produced by ingestion and consumed by search
//! - Word embedding tables and the semantic encoder
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod embeddings;
pub mod errors;
pub mod metrics;
pub mod models;

// Re-export commonly used types
pub use config::AppConfig;
pub use embeddings::{EmbeddingTable, SemanticEncoder};
pub use errors::{AppError, Result};
pub use models::Paper;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Multiplier applied to final authority scores so they print as readable
/// magnitudes. Fusion divides by the same value.
pub const AUTHORITY_SCALE: f64 = 100_000.0;
