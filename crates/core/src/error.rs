//! Error types for polyrag.
//!
//! A single error enum covers configuration problems, I/O, and failures of
//! each external collaborator (embedding, reranking, generation, vector index).

use thiserror::Error;

/// Unified error type for polyrag.
///
/// Collaborator failures are propagated unchanged to the caller of the
/// pipeline; nothing in the orchestration layer retries them.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (missing credentials, bad settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Text generation service errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding service errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Reranking service errors
    #[error("Rerank error: {0}")]
    Rerank(String),

    /// Vector index errors
    #[error("Index error: {0}")]
    Index(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
