//! Error types for PaperRank
//!
//! Provides a single error enum shared by every crate with:
//! - Distinct variants for ingestion, query and collaborator failures
//! - Machine-readable error codes
//! - Fatal vs. per-query classification

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Ingestion errors (1xxx)
    ParseError,
    EmbeddingLoadError,

    // Query errors (2xxx)
    QuerySyntaxError,
    ValidationError,
    Timeout,

    // Collaborator errors (3xxx)
    IndexUnavailable,
    ClusteringError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
    IoError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Ingestion (1xxx)
            ErrorCode::ParseError => 1001,
            ErrorCode::EmbeddingLoadError => 1002,

            // Query (2xxx)
            ErrorCode::QuerySyntaxError => 2001,
            ErrorCode::ValidationError => 2002,
            ErrorCode::Timeout => 2003,

            // Collaborators (3xxx)
            ErrorCode::IndexUnavailable => 3001,
            ErrorCode::ClusteringError => 3002,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
            ErrorCode::IoError => 9004,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Ingestion errors
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Failed to load embedding model {path}: {message}")]
    EmbeddingLoad { path: String, message: String },

    // Query errors
    #[error("Cannot parse query '{query}': {message}")]
    QuerySyntax { query: String, message: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Query timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // Collaborator errors
    #[error("Text index unavailable: {message}")]
    IndexUnavailable { message: String },

    #[error("Clustering failed: {message}")]
    Clustering { message: String },

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Parse { .. } => ErrorCode::ParseError,
            AppError::EmbeddingLoad { .. } => ErrorCode::EmbeddingLoadError,
            AppError::QuerySyntax { .. } => ErrorCode::QuerySyntaxError,
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::Timeout { .. } => ErrorCode::Timeout,
            AppError::IndexUnavailable { .. } => ErrorCode::IndexUnavailable,
            AppError::Clustering { .. } => ErrorCode::ClusteringError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Io(_) => ErrorCode::IoError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Whether this error aborts engine construction.
    ///
    /// Per-query errors leave the corpus untouched and can be reported to
    /// the caller; everything else is raised during startup.
    pub fn is_fatal(&self) -> bool {
        !self.is_query_error()
    }

    /// Check if this error belongs to a single query
    pub fn is_query_error(&self) -> bool {
        matches!(
            self,
            AppError::QuerySyntax { .. }
                | AppError::Validation { .. }
                | AppError::Timeout { .. }
                | AppError::IndexUnavailable { .. }
                | AppError::Clustering { .. }
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}
