// Error types for the retrieval core

use thiserror::Error;

/// Failures of the embedding / generation collaborators
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("model failed to load: {0}")]
    Load(String),

    #[error("embedding failed: {0}")]
    Embed(String),

    #[error("generation failed: {0}")]
    Generate(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors raised by the vector store, keyword index and updater
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("no vector index available; create or load an index first")]
    IndexUnavailable,

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("{vectors} vectors supplied for {metadata} metadata records")]
    LengthMismatch { vectors: usize, metadata: usize },

    #[error("corrupt index: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IndexError>;
