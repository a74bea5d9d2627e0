//! Single document writes.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::{bulk_action_line, BulkResult, BulkableWork, SearchWork, WorkExecutionContext};
use crate::errors::SearchIndexError;
use search_indexer_shared::{DocumentReference, WriteOutcome, WriteOutcomeKind};

/// Read a write outcome from a single-document response body or a bulk item body.
pub(crate) fn parse_write_outcome(
    document: &DocumentReference,
    body: &Value,
) -> Result<WriteOutcome, SearchIndexError> {
    let result = body
        .get("result")
        .and_then(Value::as_str)
        .ok_or_else(|| SearchIndexError::parse(format!("Write response without result: {}", body)))?;

    let kind = WriteOutcomeKind::from_result(result)
        .ok_or_else(|| SearchIndexError::parse(format!("Unknown write result: {}", result)))?;

    let outcome = WriteOutcome::new(document.clone(), kind);
    Ok(match body.get("_version").and_then(Value::as_u64) {
        Some(version) => outcome.with_version(version),
        None => outcome,
    })
}

/// Index (create or replace) a whole document.
#[derive(Debug, Clone)]
pub struct IndexDocumentWork {
    document: DocumentReference,
    source: Value,
}

impl IndexDocumentWork {
    pub fn new(document: DocumentReference, source: Value) -> Self {
        Self { document, source }
    }

    pub fn source(&self) -> &Value {
        &self.source
    }
}

#[async_trait]
impl SearchWork<WriteOutcome> for IndexDocumentWork {
    async fn execute(&self, context: &WorkExecutionContext) -> Result<WriteOutcome, SearchIndexError> {
        let body = context
            .client()
            .index_document(&self.document, &self.source)
            .await?;
        parse_write_outcome(&self.document, &body)
    }
}

impl BulkableWork for IndexDocumentWork {
    fn document(&self) -> &DocumentReference {
        &self.document
    }

    fn bulk_lines(&self) -> Vec<Value> {
        vec![bulk_action_line("index", &self.document), self.source.clone()]
    }
}

/// Update specific fields of a document, creating it if it doesn't exist.
///
/// Only the fields present in the partial document are written; all other
/// fields are left unchanged. An empty partial document is still sent, so the
/// document exists afterwards whether or not the work was bulked.
#[derive(Debug, Clone)]
pub struct UpdateDocumentWork {
    document: DocumentReference,
    partial: Map<String, Value>,
}

impl UpdateDocumentWork {
    pub fn new(document: DocumentReference, partial: Map<String, Value>) -> Self {
        Self { document, partial }
    }

    /// Set a single field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.partial.insert(name.into(), value.into());
        self
    }
}

#[async_trait]
impl SearchWork<WriteOutcome> for UpdateDocumentWork {
    async fn execute(&self, context: &WorkExecutionContext) -> Result<WriteOutcome, SearchIndexError> {
        let partial = Value::Object(self.partial.clone());
        let body = context
            .client()
            .update_document(&self.document, &partial)
            .await?;
        parse_write_outcome(&self.document, &body)
    }
}

impl BulkableWork for UpdateDocumentWork {
    fn document(&self) -> &DocumentReference {
        &self.document
    }

    fn bulk_lines(&self) -> Vec<Value> {
        vec![
            bulk_action_line("update", &self.document),
            json!({
                "doc": self.partial,
                "doc_as_upsert": true
            }),
        ]
    }
}

/// Delete a document. Deleting a missing document is not a failure.
#[derive(Debug, Clone)]
pub struct DeleteDocumentWork {
    document: DocumentReference,
}

impl DeleteDocumentWork {
    pub fn new(document: DocumentReference) -> Self {
        Self { document }
    }
}

#[async_trait]
impl SearchWork<WriteOutcome> for DeleteDocumentWork {
    async fn execute(&self, context: &WorkExecutionContext) -> Result<WriteOutcome, SearchIndexError> {
        let body = context.client().delete_document(&self.document).await?;
        parse_write_outcome(&self.document, &body)
    }
}

impl BulkableWork for DeleteDocumentWork {
    fn document(&self) -> &DocumentReference {
        &self.document
    }

    fn bulk_lines(&self) -> Vec<Value> {
        vec![bulk_action_line("delete", &self.document)]
    }

    fn extract(&self, result: &BulkResult, index: usize) -> Result<WriteOutcome, SearchIndexError> {
        let item = result.item(index)?;
        // 404 is acceptable - document may not exist
        if item.status == 404 {
            return Ok(WriteOutcome::new(
                self.document.clone(),
                WriteOutcomeKind::NotFound,
            ));
        }
        item.to_outcome(&self.document)
    }
}
