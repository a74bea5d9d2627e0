//! # Search Indexer Repository
//!
//! This crate provides the backend-facing half of the search indexer: the
//! `SearchClient` interface and its OpenSearch implementation, and the
//! index works (single document writes, refreshes, bulks) executed against it.

pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod work;

pub use errors::SearchIndexError;
pub use interfaces::SearchClient;
pub use opensearch::OpenSearchClient;
pub use work::{
    BulkResult, BulkResultItem, BulkWork, BulkWorkFactory, BulkableWork, DeleteDocumentWork,
    IndexDocumentWork, RefreshWork, SearchWork, UpdateDocumentWork, WorkExecutionContext,
};
