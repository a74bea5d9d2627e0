//! # Search Indexer
//!
//! Main library for the search indexer work orchestration.
//!
//! This crate reads the configuration, initializes tracing and wires the
//! OpenSearch client to a running work orchestrator.

pub mod config;
pub mod telemetry;

pub use config::{Dependencies, IndexerSettings};
pub use search_indexer_orchestration::{Changeset, ChangesetWork, DocumentRefreshStrategy};
pub use search_indexer_shared::{DocumentReference, WriteOutcome, WriteOutcomeKind};

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Orchestration error.
    #[error("Orchestration error: {0}")]
    OrchestrationError(#[from] search_indexer_orchestration::OrchestrationError),

    /// Search error.
    #[error("Search error: {0}")]
    SearchError(#[from] search_indexer_repository::SearchIndexError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
