//! Outbox error types.

use thiserror::Error;

/// Outbox error type.
///
/// Sink failures are not represented here: they are delivery outcomes
/// handled by the worker. Anything in `Storage` means the local queue itself
/// is broken.
#[derive(Error, Debug)]
pub enum OutboxError {
    /// Queue store error
    #[error("Storage error: {0}")]
    Storage(#[from] bridge_database::DatabaseError),

    /// HTTP client construction error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Blocking task failed to complete
    #[error("Task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    /// Ingest channel closed
    #[error("Ingest channel closed")]
    ChannelClosed,

    /// Ingest channel at capacity
    #[error("Ingest channel full")]
    IngestFull,
}

impl From<bridge_config_and_utils::CoreError> for OutboxError {
    fn from(e: bridge_config_and_utils::CoreError) -> Self {
        Self::Config(e.to_string())
    }
}

/// Result type alias using OutboxError.
pub type OutboxResult<T> = Result<T, OutboxError>;
