//! Error types for the search indexer orchestration.

use search_indexer_repository::SearchIndexError;
use thiserror::Error;

/// Errors that can occur while sequencing and orchestrating works.
#[derive(Error, Debug)]
pub enum OrchestrationError {
    /// A component was driven out of protocol. This is a programming error
    /// in the caller, not a backend condition.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Invalid configuration values.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The orchestrator no longer accepts or answers changesets.
    #[error("Orchestrator is shut down")]
    ShutDown,

    /// The background worker task failed.
    #[error("Worker error: {0}")]
    WorkerError(String),

    /// Error from the search backend.
    #[error("Search error: {0}")]
    SearchError(#[from] SearchIndexError),
}

impl OrchestrationError {
    /// Create a protocol violation error.
    pub fn protocol_violation(msg: impl Into<String>) -> Self {
        Self::ProtocolViolation(msg.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a worker error.
    pub fn worker(msg: impl Into<String>) -> Self {
        Self::WorkerError(msg.into())
    }
}
