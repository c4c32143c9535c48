//! Error types for the matcher

use thiserror::Error;

/// Workspace-wide error type
///
/// Only `NotFound` and `DataInconsistency` abort a caller's request. The
/// remaining structural variants are produced internally and absorbed where
/// they occur (a degenerate vector scores 0, a failed generation leaves the
/// explanation absent, a malformed row is skipped during a bulk load).
#[derive(Error, Debug)]
pub enum HarmonyError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Data inconsistency: {0}")]
    DataInconsistency(String),

    #[error("Degenerate vector: {0}")]
    DegenerateVector(String),

    #[error("Generation unavailable: {0}")]
    GenerationUnavailable(String),

    #[error("Malformed row: {0}")]
    MalformedRow(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HarmonyError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        HarmonyError::NotFound(msg.into())
    }

    pub fn data_inconsistency(msg: impl Into<String>) -> Self {
        HarmonyError::DataInconsistency(msg.into())
    }

    pub fn degenerate_vector(msg: impl Into<String>) -> Self {
        HarmonyError::DegenerateVector(msg.into())
    }

    pub fn generation_unavailable(msg: impl Into<String>) -> Self {
        HarmonyError::GenerationUnavailable(msg.into())
    }

    pub fn malformed_row(msg: impl Into<String>) -> Self {
        HarmonyError::MalformedRow(msg.into())
    }

    pub fn api(msg: impl Into<String>) -> Self {
        HarmonyError::Api(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        HarmonyError::Database(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        HarmonyError::Storage(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        HarmonyError::Parse(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        HarmonyError::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        HarmonyError::Internal(msg.into())
    }

    /// Whether this error should abort the caller's request
    pub fn is_request_fatal(&self) -> bool {
        matches!(
            self,
            HarmonyError::NotFound(_) | HarmonyError::DataInconsistency(_)
        )
    }
}

/// Result type alias for matcher operations
pub type HarmonyResult<T> = Result<T, HarmonyError>;
