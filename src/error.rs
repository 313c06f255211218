//! Error types for the review service.

use crate::review::model::Criterion;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Scoring error: {0}")]
    Scoring(#[from] ScoringError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Errors from the external scoring API.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("Please fill in both the prompt and essay fields.")]
    MissingInput,

    #[error("HTTP error! status: {status}")]
    Status { status: u16 },

    #[error("Scoring request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Errors raised by a review session in response to a client action.
///
/// These are reported back to the client; they never end the session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No score result loaded")]
    NoResult,

    #[error("No feedback available for {criterion}")]
    NoFeedback { criterion: Criterion },

    #[error("Details are not available in export mode")]
    ExportMode,

    #[error("Session {0} has ended")]
    Ended(uuid::Uuid),
}

/// Result type alias for the review service.
pub type Result<T> = std::result::Result<T, Error>;
