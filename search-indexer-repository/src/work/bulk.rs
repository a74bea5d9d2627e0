//! Bulk works and bulk results.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::document::parse_write_outcome;
use super::{BulkableWork, SearchWork, WorkExecutionContext};
use crate::errors::SearchIndexError;
use search_indexer_shared::{DocumentReference, WriteOutcome};

/// Builds the bulk work executing an ordered list of bulkable works.
///
/// Construction only: no request is sent until the returned work executes.
pub type BulkWorkFactory =
    Arc<dyn Fn(Vec<Arc<dyn BulkableWork>>) -> Arc<dyn SearchWork<BulkResult>> + Send + Sync>;

/// Raw shape of a bulk response body.
#[derive(Debug, Deserialize)]
struct BulkResponseBody {
    #[serde(default)]
    took: Option<u64>,
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<HashMap<String, Value>>,
}

/// Outcome of one item of a bulk request, as reported by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkResultItem {
    /// The bulk action the item was sent with (`index`, `update`, `delete`).
    pub action: String,
    /// HTTP status of this item.
    pub status: u16,
    /// The item body (`_id`, `result`, `_version`, `error`, ...).
    pub body: Value,
}

impl BulkResultItem {
    pub fn new(action: impl Into<String>, status: u16, body: Value) -> Self {
        Self {
            action: action.into(),
            status,
            body,
        }
    }

    /// Whether the backend accepted this item.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Human readable failure description taken from the item's `error` field.
    pub fn failure_reason(&self) -> String {
        match self.body.get("error") {
            Some(Value::Object(error)) => {
                let kind = error.get("type").and_then(Value::as_str);
                let reason = error.get("reason").and_then(Value::as_str);
                match (kind, reason) {
                    (Some(kind), Some(reason)) => format!("{}: {}", kind, reason),
                    (Some(text), None) | (None, Some(text)) => text.to_string(),
                    (None, None) => Value::Object(error.clone()).to_string(),
                }
            }
            Some(Value::String(reason)) => reason.clone(),
            _ => format!("{} failed", self.action),
        }
    }

    /// Convert this item into the outcome of a write on `document`.
    pub fn to_outcome(&self, document: &DocumentReference) -> Result<WriteOutcome, SearchIndexError> {
        if !self.is_success() {
            return Err(SearchIndexError::bulk_item_failed(
                self.status,
                self.failure_reason(),
            ));
        }
        parse_write_outcome(document, &self.body)
    }

    fn from_entry(entry: HashMap<String, Value>) -> Result<Self, SearchIndexError> {
        let (action, body) = entry
            .into_iter()
            .next()
            .ok_or_else(|| SearchIndexError::parse("Empty bulk response item"))?;

        let status = body
            .get("status")
            .and_then(Value::as_u64)
            .and_then(|status| u16::try_from(status).ok())
            .ok_or_else(|| {
                SearchIndexError::parse(format!("Bulk response item without status: {}", body))
            })?;

        Ok(Self::new(action, status, body))
    }
}

/// Ordered per-item outcomes of one bulk request, same order as submission.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkResult {
    took: Option<u64>,
    errors: bool,
    items: Vec<BulkResultItem>,
}

impl BulkResult {
    /// Create a result from already parsed items.
    pub fn new(items: Vec<BulkResultItem>) -> Self {
        let errors = items.iter().any(|item| !item.is_success());
        Self {
            took: None,
            errors,
            items,
        }
    }

    /// Parse a bulk response body.
    pub fn from_response(response: Value) -> Result<Self, SearchIndexError> {
        let body: BulkResponseBody = serde_json::from_value(response)
            .map_err(|e| SearchIndexError::parse(format!("Invalid bulk response: {}", e)))?;

        let items = body
            .items
            .into_iter()
            .map(BulkResultItem::from_entry)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            took: body.took,
            errors: body.errors,
            items,
        })
    }

    /// The item at position `index`.
    pub fn item(&self, index: usize) -> Result<&BulkResultItem, SearchIndexError> {
        self.items
            .get(index)
            .ok_or_else(|| SearchIndexError::missing_bulk_item(index, self.items.len()))
    }

    pub fn items(&self) -> &[BulkResultItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether at least one item failed.
    pub fn has_errors(&self) -> bool {
        self.errors || self.failed_count() > 0
    }

    pub fn failed_count(&self) -> usize {
        self.items.iter().filter(|item| !item.is_success()).count()
    }

    /// Time the backend spent on the request, in milliseconds.
    pub fn took(&self) -> Option<u64> {
        self.took
    }
}

/// A composite work sending many bulkable works as one bulk request.
#[derive(Debug)]
pub struct BulkWork {
    works: Vec<Arc<dyn BulkableWork>>,
}

impl BulkWork {
    pub fn new(works: Vec<Arc<dyn BulkableWork>>) -> Self {
        Self { works }
    }

    /// The default factory, building a plain `BulkWork`.
    pub fn factory() -> BulkWorkFactory {
        Arc::new(|works| Arc::new(BulkWork::new(works)) as Arc<dyn SearchWork<BulkResult>>)
    }

    pub fn works(&self) -> &[Arc<dyn BulkableWork>] {
        &self.works
    }

    pub fn len(&self) -> usize {
        self.works.len()
    }

    pub fn is_empty(&self) -> bool {
        self.works.is_empty()
    }
}

#[async_trait]
impl SearchWork<BulkResult> for BulkWork {
    /// Send the bulk request.
    ///
    /// Fails only when the request as a whole fails; item failures are
    /// reported inside the returned `BulkResult`.
    async fn execute(&self, context: &WorkExecutionContext) -> Result<BulkResult, SearchIndexError> {
        let lines: Vec<Value> = self.works.iter().flat_map(|work| work.bulk_lines()).collect();

        debug!(items = self.works.len(), "Executing bulk request");

        let response = context.client().bulk(lines).await?;
        let result = BulkResult::from_response(response)?;

        if result.len() != self.works.len() {
            warn!(
                submitted = self.works.len(),
                returned = result.len(),
                "Bulk response item count does not match the request"
            );
        }
        if result.has_errors() {
            warn!(
                failed = result.failed_count(),
                total = result.len(),
                "Bulk request reported item failures"
            );
        }

        Ok(result)
    }
}
