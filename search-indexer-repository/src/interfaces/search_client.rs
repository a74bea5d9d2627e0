//! Search client trait definition.
//!
//! This module defines the narrow interface the index works use to reach the
//! search backend. Request transport, connection pooling and JSON encoding of
//! the HTTP bodies are the implementation's concern.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::SearchIndexError;
use search_indexer_shared::DocumentReference;

/// Abstract interface for search backend operations.
///
/// Implementations can be swapped for different backends (OpenSearch, mock, etc.)
/// enabling easy testing of the orchestration layer.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Responses
///
/// Write operations return the raw response body so that each work can
/// interpret the outcome itself.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Index a single document, replacing any existing document with the same id.
    ///
    /// # Arguments
    ///
    /// * `document` - The target document
    /// * `source` - The full document source
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - The backend response body
    /// * `Err(SearchIndexError)` - If the request fails or is rejected
    async fn index_document(
        &self,
        document: &DocumentReference,
        source: &Value,
    ) -> Result<Value, SearchIndexError>;

    /// Update specific fields of a document, creating it if it doesn't exist (upsert).
    ///
    /// # Arguments
    ///
    /// * `document` - The target document
    /// * `partial` - The fields to set
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - The backend response body
    /// * `Err(SearchIndexError)` - If the request fails or is rejected
    async fn update_document(
        &self,
        document: &DocumentReference,
        partial: &Value,
    ) -> Result<Value, SearchIndexError>;

    /// Delete a document from the search index.
    ///
    /// A missing document is not an error: the response body then reports
    /// a `not_found` result.
    async fn delete_document(&self, document: &DocumentReference)
        -> Result<Value, SearchIndexError>;

    /// Send a bulk request made of the given action and source lines.
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - The bulk response body, which may report per-item failures
    /// * `Err(SearchIndexError)` - If the request as a whole fails
    async fn bulk(&self, lines: Vec<Value>) -> Result<Value, SearchIndexError>;

    /// Refresh the given indexes so that recent writes become searchable.
    async fn refresh(&self, indexes: &[String]) -> Result<(), SearchIndexError>;

    /// Check if the search engine is healthy and reachable.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the search engine is healthy
    /// * `Ok(false)` - If the search engine is unhealthy
    /// * `Err(SearchIndexError)` - If the health check fails to execute
    async fn health_check(&self) -> Result<bool, SearchIndexError>;
}
