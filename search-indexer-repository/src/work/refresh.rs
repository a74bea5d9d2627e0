//! Index refresh.

use async_trait::async_trait;

use super::{SearchWork, WorkExecutionContext};
use crate::errors::SearchIndexError;

/// Refresh a set of indexes so that previous writes become visible to searches.
///
/// Never bulked: it must run after the writes it makes visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshWork {
    indexes: Vec<String>,
}

impl RefreshWork {
    /// Create a refresh of the given indexes, ignoring duplicates.
    pub fn new<I, S>(indexes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut indexes: Vec<String> = indexes.into_iter().map(Into::into).collect();
        indexes.sort();
        indexes.dedup();
        Self { indexes }
    }

    pub fn indexes(&self) -> &[String] {
        &self.indexes
    }
}

#[async_trait]
impl SearchWork<()> for RefreshWork {
    async fn execute(&self, context: &WorkExecutionContext) -> Result<(), SearchIndexError> {
        if self.indexes.is_empty() {
            return Ok(());
        }
        context.client().refresh(&self.indexes).await
    }
}
