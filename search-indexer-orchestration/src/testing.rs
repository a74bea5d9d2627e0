//! Test helpers: a scripted search client and sample works.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use search_indexer_repository::{
    BulkableWork, DeleteDocumentWork, IndexDocumentWork, SearchClient, SearchIndexError,
    WorkExecutionContext,
};
use search_indexer_shared::DocumentReference;

/// One request received by [`ScriptedSearchClient`], identified by document ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ClientCall {
    Index(String),
    Update(String),
    Delete(String),
    Bulk(Vec<String>),
    Refresh(Vec<String>),
}

/// Search client answering every request itself.
///
/// Writes succeed unless the document id is listed as failing. Bulk responses
/// are built from the action lines, with one item per action.
pub(crate) struct ScriptedSearchClient {
    calls: Mutex<Vec<ClientCall>>,
    failing_ids: HashSet<String>,
    fail_bulk: bool,
}

impl ScriptedSearchClient {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing_ids: HashSet::new(),
            fail_bulk: false,
        }
    }

    /// Reject writes of these document ids, alone or inside a bulk.
    pub fn with_failing_ids(mut self, ids: &[&str]) -> Self {
        self.failing_ids = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    /// Fail every bulk request as a whole.
    pub fn failing_bulk(mut self) -> Self {
        self.fail_bulk = true;
        self
    }

    pub async fn calls(&self) -> Vec<ClientCall> {
        self.calls.lock().await.clone()
    }

    async fn single_write(
        &self,
        call: ClientCall,
        document: &DocumentReference,
        result: &str,
    ) -> Result<Value, SearchIndexError> {
        self.calls.lock().await.push(call);
        if self.failing_ids.contains(&document.id) {
            return Err(SearchIndexError::index(format!("rejected {}", document)));
        }
        Ok(json!({ "_id": document.id, "_version": 1, "result": result }))
    }

    fn bulk_item(&self, action: &str, metadata: &Value) -> (String, Value) {
        let id = metadata
            .get("_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let item = if self.failing_ids.contains(&id) {
            json!({ action: {
                "_id": id,
                "status": 400,
                "error": { "type": "mapper_parsing_exception", "reason": "failed to parse" }
            }})
        } else {
            let (status, result) = match action {
                "index" => (201, "created"),
                "update" => (200, "updated"),
                _ => (200, "deleted"),
            };
            json!({ action: { "_id": id, "_version": 1, "result": result, "status": status } })
        };
        (id, item)
    }
}

#[async_trait]
impl SearchClient for ScriptedSearchClient {
    async fn index_document(
        &self,
        document: &DocumentReference,
        _source: &Value,
    ) -> Result<Value, SearchIndexError> {
        self.single_write(ClientCall::Index(document.id.clone()), document, "created")
            .await
    }

    async fn update_document(
        &self,
        document: &DocumentReference,
        _partial: &Value,
    ) -> Result<Value, SearchIndexError> {
        self.single_write(ClientCall::Update(document.id.clone()), document, "updated")
            .await
    }

    async fn delete_document(
        &self,
        document: &DocumentReference,
    ) -> Result<Value, SearchIndexError> {
        self.single_write(ClientCall::Delete(document.id.clone()), document, "deleted")
            .await
    }

    async fn bulk(&self, lines: Vec<Value>) -> Result<Value, SearchIndexError> {
        let mut ids = Vec::new();
        let mut items = Vec::new();
        let mut lines = lines.iter();
        while let Some(line) = lines.next() {
            let Some((action, metadata)) = line.as_object().and_then(|line| line.iter().next())
            else {
                continue;
            };
            if action != "delete" {
                // Skip the source line.
                lines.next();
            }
            let (id, item) = self.bulk_item(action, metadata);
            ids.push(id);
            items.push(item);
        }

        let errors = ids.iter().any(|id| self.failing_ids.contains(id));
        self.calls.lock().await.push(ClientCall::Bulk(ids));
        if self.fail_bulk {
            return Err(SearchIndexError::bulk_operation("connection reset"));
        }

        Ok(json!({ "took": 1, "errors": errors, "items": items }))
    }

    async fn refresh(&self, indexes: &[String]) -> Result<(), SearchIndexError> {
        self.calls
            .lock()
            .await
            .push(ClientCall::Refresh(indexes.to_vec()));
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, SearchIndexError> {
        Ok(true)
    }
}

pub(crate) fn context(client: Arc<ScriptedSearchClient>) -> WorkExecutionContext {
    WorkExecutionContext::new(client)
}

pub(crate) fn index_work(id: &str) -> Arc<dyn BulkableWork> {
    Arc::new(IndexDocumentWork::new(
        DocumentReference::new("books", id),
        json!({ "title": format!("Book {}", id) }),
    ))
}

pub(crate) fn delete_work(id: &str) -> Arc<dyn BulkableWork> {
    Arc::new(DeleteDocumentWork::new(DocumentReference::new("books", id)))
}
