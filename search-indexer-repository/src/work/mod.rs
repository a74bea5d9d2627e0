//! Index works.
//!
//! A work is one atomic operation against the search backend. Bulkable works
//! can additionally be serialized as items of a bulk request and read their
//! own outcome back from the bulk response.

mod bulk;
mod document;
mod refresh;

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchClient;
use search_indexer_shared::{DocumentReference, WriteOutcome};

pub use bulk::{BulkResult, BulkResultItem, BulkWork, BulkWorkFactory};
pub use document::{DeleteDocumentWork, IndexDocumentWork, UpdateDocumentWork};
pub use refresh::RefreshWork;

/// Everything a work needs while executing.
#[derive(Clone)]
pub struct WorkExecutionContext {
    client: Arc<dyn SearchClient>,
}

impl WorkExecutionContext {
    pub fn new(client: Arc<dyn SearchClient>) -> Self {
        Self { client }
    }

    /// The client works send their requests through.
    pub fn client(&self) -> &dyn SearchClient {
        self.client.as_ref()
    }
}

impl fmt::Debug for WorkExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkExecutionContext").finish_non_exhaustive()
    }
}

/// A unit of work executed against the search backend, producing a `T`.
///
/// Works are immutable once created and are shared by reference.
#[async_trait]
pub trait SearchWork<T>: Send + Sync + fmt::Debug
where
    T: Send + 'static,
{
    /// Execute the work on its own.
    async fn execute(&self, context: &WorkExecutionContext) -> Result<T, SearchIndexError>;
}

#[async_trait]
impl<T, W> SearchWork<T> for Arc<W>
where
    T: Send + 'static,
    W: SearchWork<T> + ?Sized,
{
    async fn execute(&self, context: &WorkExecutionContext) -> Result<T, SearchIndexError> {
        (**self).execute(context).await
    }
}

/// A document write that may travel inside a bulk request.
pub trait BulkableWork: SearchWork<WriteOutcome> {
    /// The document this work writes.
    fn document(&self) -> &DocumentReference;

    /// The lines this work contributes to a bulk request body: an action line,
    /// optionally followed by a source line.
    fn bulk_lines(&self) -> Vec<Value>;

    /// Extract this work's outcome from the item at `index` of a bulk result.
    ///
    /// A failed item only fails this work; it never affects sibling items.
    fn extract(&self, result: &BulkResult, index: usize) -> Result<WriteOutcome, SearchIndexError> {
        result.item(index)?.to_outcome(self.document())
    }
}

/// Build the action line of a bulk item, e.g. `{"index": {"_index": .., "_id": ..}}`.
pub(crate) fn bulk_action_line(action: &str, document: &DocumentReference) -> Value {
    let mut metadata = serde_json::Map::new();
    metadata.insert("_index".to_string(), Value::from(document.index.as_str()));
    metadata.insert("_id".to_string(), Value::from(document.id.as_str()));
    if let Some(ref routing) = document.routing {
        metadata.insert("routing".to_string(), Value::from(routing.as_str()));
    }

    let mut line = serde_json::Map::new();
    line.insert(action.to_string(), Value::Object(metadata));
    Value::Object(line)
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bulk_action_line() {
        let document = DocumentReference::new("books", "1");
        assert_eq!(
            bulk_action_line("index", &document),
            json!({ "index": { "_index": "books", "_id": "1" } })
        );

        let routed = DocumentReference::new("books", "2").with_routing("tenant-a");
        assert_eq!(
            bulk_action_line("delete", &routed),
            json!({ "delete": { "_index": "books", "_id": "2", "routing": "tenant-a" } })
        );
    }
}
