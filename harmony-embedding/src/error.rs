//! Error types for embedding operations

use harmony_core::HarmonyError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmbeddingError>;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("OpenAI API error: {0}")]
    OpenAI(#[from] async_openai::error::OpenAIError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Embedding batch mismatch: sent {sent} texts, received {received} vectors")]
    BatchMismatch { sent: usize, received: usize },

    #[error("Embedding request timed out after {0}s")]
    Timeout(u64),

    #[error("Embedding not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<rusqlite::Error> for EmbeddingError {
    fn from(e: rusqlite::Error) -> Self {
        EmbeddingError::Database(e.to_string())
    }
}

impl From<EmbeddingError> for HarmonyError {
    fn from(e: EmbeddingError) -> Self {
        match e {
            EmbeddingError::NotFound(msg) => HarmonyError::not_found(msg),
            EmbeddingError::Database(msg) => HarmonyError::database(msg),
            EmbeddingError::Config(msg) => HarmonyError::config(msg),
            EmbeddingError::Serialization(e) => HarmonyError::parse(e.to_string()),
            other => HarmonyError::api(other.to_string()),
        }
    }
}
