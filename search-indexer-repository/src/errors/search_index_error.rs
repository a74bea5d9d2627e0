//! Search index error types.
//!
//! This module defines the error types that can occur while executing works
//! against the search index.

use thiserror::Error;

/// Errors that can occur during search index operations.
///
/// The type is `Clone` because a single failure (for instance a failed bulk
/// request) is reported to every work that depended on it.
#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    /// Validation error (e.g., malformed work payload).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Failed to establish connection to the search engine.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Failed to index a document.
    #[error("Index error: {0}")]
    IndexError(String),

    /// Failed to update a document.
    #[error("Update error: {0}")]
    UpdateError(String),

    /// Failed to delete a document.
    #[error("Delete error: {0}")]
    DeleteError(String),

    /// Failed to refresh indexes.
    #[error("Refresh error: {0}")]
    RefreshError(String),

    /// The bulk request itself failed.
    #[error("Bulk operation error: {0}")]
    BulkOperationError(String),

    /// The backend rejected one item of a bulk request.
    #[error("Bulk item failed with status {status}: {reason}")]
    BulkItemFailed { status: u16, reason: String },

    /// The bulk response holds fewer items than were submitted.
    #[error("Bulk response has no item at position {index} ({available} items returned)")]
    MissingBulkItem { index: usize, available: usize },

    /// Failed to parse a response from the search engine.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The work was discarded before it could complete.
    #[error("Work abandoned before completion: {0}")]
    Abandoned(String),

    /// Unknown error.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl SearchIndexError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an index error.
    pub fn index(msg: impl Into<String>) -> Self {
        Self::IndexError(msg.into())
    }

    /// Create an update error.
    pub fn update(msg: impl Into<String>) -> Self {
        Self::UpdateError(msg.into())
    }

    /// Create a delete error.
    pub fn delete(msg: impl Into<String>) -> Self {
        Self::DeleteError(msg.into())
    }

    /// Create a refresh error.
    pub fn refresh(msg: impl Into<String>) -> Self {
        Self::RefreshError(msg.into())
    }

    /// Create a bulk operation error.
    pub fn bulk_operation(msg: impl Into<String>) -> Self {
        Self::BulkOperationError(msg.into())
    }

    /// Create a bulk item failure.
    pub fn bulk_item_failed(status: u16, reason: impl Into<String>) -> Self {
        Self::BulkItemFailed {
            status,
            reason: reason.into(),
        }
    }

    /// Create a missing bulk item error.
    pub fn missing_bulk_item(index: usize, available: usize) -> Self {
        Self::MissingBulkItem { index, available }
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create an abandoned work error.
    pub fn abandoned(msg: impl Into<String>) -> Self {
        Self::Abandoned(msg.into())
    }

    /// Create an unknown error.
    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown(msg.into())
    }
}
