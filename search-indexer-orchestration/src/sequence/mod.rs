//! Work sequences.
//!
//! A sequence builder records execution steps in order and hands out an
//! [`Eventual`] for the outcome of each of them. Nothing runs while steps are
//! registered; the built sequence runs them later, one after the other, in
//! registration order.

mod builder;

use std::sync::Arc;

use crate::deferred::Eventual;
use search_indexer_repository::{BulkResult, BulkableWork, SearchWork};
use search_indexer_shared::WriteOutcome;

pub use builder::{DefaultWorkSequenceBuilder, WorkSequence};

/// A bulk work, as produced by a bulk work factory.
pub type BulkWorkRef = Arc<dyn SearchWork<BulkResult>>;

/// Registration primitives used by the bulker and the work processor.
pub trait WorkSequenceBuilder {
    /// Schedule a single standalone work.
    fn add_non_bulk_execution<T, W>(&mut self, work: W) -> Eventual<T>
    where
        T: Clone + Send + Sync + 'static,
        W: SearchWork<T> + 'static;

    /// Schedule the execution of a bulk work that will only be known later.
    ///
    /// The returned result resolves once the bulk has actually run, or with
    /// the bulk work's own failure if it never became available.
    fn add_bulk_execution(&mut self, bulk_work: Eventual<BulkWorkRef>)
        -> Eventual<Arc<BulkResult>>;

    /// Schedule the extraction of item outcomes from an eventual bulk result.
    ///
    /// Items are registered on the returned step before the next call to the
    /// builder.
    fn add_bulk_result_extraction(
        &mut self,
        bulk_result: Eventual<Arc<BulkResult>>,
    ) -> &mut dyn BulkResultExtractionStep;
}

/// Extraction of individual outcomes out of one bulk result.
pub trait BulkResultExtractionStep {
    /// Register the extraction of `work`'s outcome from the item at `index`.
    fn add(&mut self, work: Arc<dyn BulkableWork>, index: usize) -> Eventual<WriteOutcome>;
}
