//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchClient`
//! using the OpenSearch Rust client.

use async_trait::async_trait;
use opensearch::{
    cluster::ClusterHealthParts,
    http::{
        request::JsonBody,
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
    },
    indices::IndicesRefreshParts,
    BulkParts, DeleteParts, IndexParts, OpenSearch, UpdateParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument};
use url::Url;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchClient;
use search_indexer_shared::DocumentReference;

/// OpenSearch client implementation.
///
/// # Example
///
/// ```ignore
/// let client = OpenSearchClient::new("http://localhost:9200").await?;
/// let document = DocumentReference::new("entities", "42");
/// client.index_document(&document, &json!({ "name": "Test Entity" })).await?;
/// ```
pub struct OpenSearchClient {
    client: OpenSearch,
}

impl OpenSearchClient {
    /// Create a new OpenSearch client connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchClient)` - A new client instance
    /// * `Err(SearchIndexError)` - If connection setup fails
    pub async fn new(url: &str) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(url = %url, "Created OpenSearch client");

        Ok(Self { client })
    }

    /// Read the response body, turning unexpected statuses into errors.
    ///
    /// A 404 is passed through as a regular body when `accept_not_found` is set.
    async fn response_body<F>(
        response: Response,
        accept_not_found: bool,
        make_error: F,
    ) -> Result<Value, SearchIndexError>
    where
        F: FnOnce(String) -> SearchIndexError,
    {
        let status = response.status_code();
        if !status.is_success() && !(accept_not_found && status.as_u16() == 404) {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Request failed");
            return Err(make_error(format!(
                "Request failed with status {}: {}",
                status, error_body
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))
    }
}

#[async_trait]
impl SearchClient for OpenSearchClient {
    async fn index_document(
        &self,
        document: &DocumentReference,
        source: &Value,
    ) -> Result<Value, SearchIndexError> {
        let mut request = self
            .client
            .index(IndexParts::IndexId(&document.index, &document.id))
            .body(source);
        if let Some(routing) = document.routing.as_deref() {
            request = request.routing(routing);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SearchIndexError::index(e.to_string()))?;

        let body = Self::response_body(response, false, |msg| SearchIndexError::index(msg)).await?;
        debug!(document = %document, "Document indexed");
        Ok(body)
    }

    async fn update_document(
        &self,
        document: &DocumentReference,
        partial: &Value,
    ) -> Result<Value, SearchIndexError> {
        // Use upsert to create document if it doesn't exist
        // API reference: https://docs.opensearch.org/latest/api-reference/document-apis/update-document/#using-the-upsert-operation
        let mut request = self
            .client
            .update(UpdateParts::IndexId(&document.index, &document.id))
            .body(json!({
                "doc": partial,
                "doc_as_upsert": true
            }));
        if let Some(routing) = document.routing.as_deref() {
            request = request.routing(routing);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SearchIndexError::update(e.to_string()))?;

        let body = Self::response_body(response, false, |msg| SearchIndexError::update(msg)).await?;
        debug!(document = %document, "Document updated/created");
        Ok(body)
    }

    async fn delete_document(
        &self,
        document: &DocumentReference,
    ) -> Result<Value, SearchIndexError> {
        let mut request = self
            .client
            .delete(DeleteParts::IndexId(&document.index, &document.id));
        if let Some(routing) = document.routing.as_deref() {
            request = request.routing(routing);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SearchIndexError::delete(e.to_string()))?;

        // 404 is acceptable - document may not exist
        let body = Self::response_body(response, true, |msg| SearchIndexError::delete(msg)).await?;
        debug!(document = %document, "Document deleted");
        Ok(body)
    }

    #[instrument(skip(self, lines), fields(line_count = lines.len()))]
    async fn bulk(&self, lines: Vec<Value>) -> Result<Value, SearchIndexError> {
        let body: Vec<JsonBody<Value>> = lines.into_iter().map(JsonBody::new).collect();

        let response = self
            .client
            .bulk(BulkParts::None)
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::bulk_operation(e.to_string()))?;

        Self::response_body(response, false, |msg| SearchIndexError::bulk_operation(msg)).await
    }

    async fn refresh(&self, indexes: &[String]) -> Result<(), SearchIndexError> {
        let index_names: Vec<&str> = indexes.iter().map(String::as_str).collect();

        let response = self
            .client
            .indices()
            .refresh(IndicesRefreshParts::Index(&index_names))
            .send()
            .await
            .map_err(|e| SearchIndexError::refresh(e.to_string()))?;

        Self::response_body(response, false, |msg| SearchIndexError::refresh(msg)).await?;
        debug!(indexes = ?indexes, "Indexes refreshed");
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, SearchIndexError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let body = Self::response_body(response, false, |msg| SearchIndexError::connection(msg)).await?;
        Ok(cluster_is_healthy(&body))
    }
}

/// A cluster is usable unless its health status is red.
fn cluster_is_healthy(health: &Value) -> bool {
    matches!(
        health.get("status").and_then(Value::as_str),
        Some("green") | Some("yellow")
    )
}
