//! Error types for the Yatri travel assistant.
//!
//! This module defines a unified error enum covering every failure category
//! in the workspace: configuration, I/O, query validation, retrieval,
//! generation, prompt rendering and serialization.

use thiserror::Error;

/// Unified error type for the Yatri workspace.
///
/// All fallible functions return `Result<T, AppError>`. The RAG engine is the
/// one place where these errors are folded into a terminal answer instead of
/// being propagated further.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or empty user input, rejected before any I/O
    #[error("Validation error: {0}")]
    Validation(String),

    /// Embedding provider or vector index could not be reached
    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    /// Generation backend errors
    #[error("Generation error: {0}")]
    Generation(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

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
