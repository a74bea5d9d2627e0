//! Changesets: ordered groups of works reported to a single submitter.

use futures::future::{join_all, BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::deferred::Outcome;
use search_indexer_repository::{BulkableWork, SearchIndexError, SearchWork};
use search_indexer_shared::WriteOutcome;

/// One work of a changeset.
#[derive(Debug, Clone)]
pub enum ChangesetWork {
    /// A document write, eligible for bulking.
    Bulkable(Arc<dyn BulkableWork>),
    /// A work that always runs on its own, after every work submitted before it.
    Standalone(Arc<dyn SearchWork<()>>),
}

impl ChangesetWork {
    pub fn bulkable(work: impl BulkableWork + 'static) -> Self {
        Self::Bulkable(Arc::new(work))
    }

    pub fn standalone(work: impl SearchWork<()> + 'static) -> Self {
        Self::Standalone(Arc::new(work))
    }
}

/// Whether the indexes written by a changeset are refreshed after it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DocumentRefreshStrategy {
    /// Leave refreshing to the backend.
    #[default]
    None,
    /// Refresh every index the changeset wrote to, once its writes are done.
    Force,
}

/// An ordered group of works submitted together.
#[derive(Debug, Clone, Default)]
pub struct Changeset {
    pub(crate) works: Vec<ChangesetWork>,
    pub(crate) refresh: DocumentRefreshStrategy,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_work(mut self, work: ChangesetWork) -> Self {
        self.works.push(work);
        self
    }

    pub fn with_refresh(mut self, refresh: DocumentRefreshStrategy) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn push(&mut self, work: ChangesetWork) {
        self.works.push(work);
    }

    pub fn len(&self) -> usize {
        self.works.len()
    }

    pub fn is_empty(&self) -> bool {
        self.works.is_empty()
    }

    pub fn refresh(&self) -> DocumentRefreshStrategy {
        self.refresh
    }

    /// Indexes written by the bulkable works of this changeset, sorted and deduplicated.
    pub fn touched_indexes(&self) -> Vec<String> {
        let mut indexes: Vec<String> = self
            .works
            .iter()
            .filter_map(|work| match work {
                ChangesetWork::Bulkable(work) => Some(work.document().index.clone()),
                ChangesetWork::Standalone(_) => None,
            })
            .collect();
        indexes.sort();
        indexes.dedup();
        indexes
    }
}

/// The outcome of one changeset step; standalone works carry no write outcome.
pub(crate) type StepOutcome = BoxFuture<'static, Outcome<Option<WriteOutcome>>>;

/// Eventual outcome of a whole changeset.
///
/// Resolves once every work of the changeset has completed, to the write
/// outcomes of its bulkable works in submission order, or to the first
/// failure in submission order.
#[must_use = "a changeset handle does nothing unless awaited"]
pub struct ChangesetHandle {
    inner: BoxFuture<'static, Result<Vec<WriteOutcome>, SearchIndexError>>,
}

impl ChangesetHandle {
    pub(crate) fn new(steps: Vec<StepOutcome>) -> Self {
        let inner = async move {
            join_all(steps)
                .await
                .into_iter()
                .filter_map(Result::transpose)
                .collect::<Result<Vec<_>, _>>()
        };
        Self {
            inner: inner.boxed(),
        }
    }
}

impl Future for ChangesetHandle {
    type Output = Result<Vec<WriteOutcome>, SearchIndexError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

impl fmt::Debug for ChangesetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangesetHandle").finish_non_exhaustive()
    }
}
