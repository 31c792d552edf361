//! Ingestion error types

use paperrank_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Dataset not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<IngestionError> for AppError {
    fn from(e: IngestionError) -> Self {
        match e {
            IngestionError::Parse { line, message } => AppError::Parse { line, message },
            IngestionError::FileNotFound(path) => AppError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("dataset not found: {}", path),
            )),
            IngestionError::IoError(err) => AppError::Io(err),
        }
    }
}
