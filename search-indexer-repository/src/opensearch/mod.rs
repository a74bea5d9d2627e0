//! OpenSearch implementation of the search client.
//!
//! This module provides a concrete implementation of `SearchClient`
//! using OpenSearch as the backend.

mod client;

pub use client::OpenSearchClient;
