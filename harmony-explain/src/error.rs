//! Error types for explanation generation

use harmony_core::HarmonyError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExplainError>;

#[derive(Debug, Error)]
pub enum ExplainError {
    #[error("Generation API error: {0}")]
    Api(String),

    #[error("Invalid generation request: {0}")]
    Request(String),

    #[error("Generation call timed out after {0}s")]
    Timeout(u64),

    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<ExplainError> for HarmonyError {
    fn from(e: ExplainError) -> Self {
        match e {
            ExplainError::Io(e) => HarmonyError::storage(e.to_string()),
            ExplainError::Serialization(e) => HarmonyError::storage(e.to_string()),
            other => HarmonyError::generation_unavailable(other.to_string()),
        }
    }
}
