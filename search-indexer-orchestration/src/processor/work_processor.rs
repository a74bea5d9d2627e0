//! Work processor implementation.
//!
//! Registers the works of successive changesets with a bulker, keeping the
//! order in which they were submitted.

use futures::future::FutureExt;
use tracing::{debug, instrument, warn};

use super::changeset::{Changeset, ChangesetHandle, ChangesetWork, DocumentRefreshStrategy, StepOutcome};
use crate::bulker::WorkBulker;
use crate::config::BulkerConfig;
use crate::deferred::Eventual;
use crate::errors::OrchestrationError;
use crate::sequence::{DefaultWorkSequenceBuilder, WorkSequence, WorkSequenceBuilder};
use search_indexer_repository::{BulkWorkFactory, RefreshWork, SearchWork};

/// Processor turning a batch of changesets into one work sequence.
///
/// Bulkable works of consecutive changesets may share a bulk. A standalone
/// work closes the current bulk first, so that it runs after every work
/// submitted before it and before every work submitted after it.
#[derive(Debug)]
pub struct WorkProcessor {
    bulker: WorkBulker<DefaultWorkSequenceBuilder>,
}

impl WorkProcessor {
    /// Create a new work processor.
    pub fn new(
        config: BulkerConfig,
        bulk_work_factory: BulkWorkFactory,
    ) -> Result<Self, OrchestrationError> {
        let bulker = WorkBulker::new(DefaultWorkSequenceBuilder::new(), bulk_work_factory, config)?;
        Ok(Self { bulker })
    }

    /// Register every work of a changeset.
    ///
    /// # Returns
    ///
    /// A handle resolving once the changeset's works have run, which only
    /// happens after the sequence returned by [`end_batch`](Self::end_batch)
    /// is executed.
    #[instrument(skip(self, changeset), fields(works = changeset.len()))]
    pub fn submit(&mut self, changeset: Changeset) -> Result<ChangesetHandle, OrchestrationError> {
        let touched_indexes = changeset.touched_indexes();
        let Changeset { works, refresh } = changeset;

        let mut steps: Vec<StepOutcome> = Vec::with_capacity(works.len() + 1);
        for work in works {
            match work {
                ChangesetWork::Bulkable(work) => {
                    let handle = self.bulker.add(work);
                    steps.push(handle.map(|outcome| outcome.map(Some)).boxed());
                }
                ChangesetWork::Standalone(work) => {
                    let outcome = self.add_standalone(work)?;
                    steps.push(outcome.map(|outcome| outcome.map(|()| None)).boxed());
                }
            }
        }

        if refresh == DocumentRefreshStrategy::Force && !touched_indexes.is_empty() {
            debug!(indexes = ?touched_indexes, "Refreshing indexes after changeset");
            let outcome = self.add_standalone(RefreshWork::new(touched_indexes))?;
            steps.push(outcome.map(|outcome| outcome.map(|()| None)).boxed());
        }

        // Registered, but left open so that the next changeset can join the bulk.
        self.bulker.add_works_to_sequence();

        Ok(ChangesetHandle::new(steps))
    }

    /// Close the batch and take the sequence of every step registered so far.
    ///
    /// On failure the whole batch is discarded.
    pub fn end_batch(&mut self) -> Result<WorkSequence, OrchestrationError> {
        self.bulker.add_works_to_sequence();
        if let Err(e) = self.bulker.finalize_bulk_work() {
            warn!(error = %e, "Discarding batch");
            self.discard();
            return Err(e);
        }
        Ok(self.bulker.sequence_builder_mut().build())
    }

    /// Drop every pending work and step. Their handles resolve as abandoned.
    pub fn discard(&mut self) {
        self.bulker.reset();
        self.bulker.sequence_builder_mut().clear();
    }

    /// Number of steps registered since the last batch ended.
    pub fn pending_steps(&self) -> usize {
        self.bulker.sequence_builder().len()
    }

    /// Number of bulkable works not part of a built bulk yet.
    pub fn pending_works(&self) -> usize {
        self.bulker.pending_count()
    }

    fn add_standalone<W>(&mut self, work: W) -> Result<Eventual<()>, OrchestrationError>
    where
        W: SearchWork<()> + 'static,
    {
        self.bulker.add_works_to_sequence();
        self.bulker.finalize_bulk_work()?;
        Ok(self.bulker.sequence_builder_mut().add_non_bulk_execution(work))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, delete_work, index_work, ClientCall, ScriptedSearchClient};
    use search_indexer_repository::{BulkWork, SearchIndexError, UpdateDocumentWork};
    use search_indexer_shared::{DocumentReference, WriteOutcome, WriteOutcomeKind};
    use std::sync::Arc;

    fn processor(min: usize, max: usize) -> WorkProcessor {
        WorkProcessor::new(BulkerConfig::new(min, max), BulkWork::factory()).unwrap()
    }

    fn changeset(ids: &[&str]) -> Changeset {
        ids.iter().fold(Changeset::new(), |changeset, id| {
            changeset.with_work(ChangesetWork::Bulkable(index_work(id)))
        })
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_invalid_config() {
        let result = WorkProcessor::new(BulkerConfig::new(0, 10), BulkWork::factory());
        assert!(matches!(result, Err(OrchestrationError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_bulk_spans_changesets() {
        let client = Arc::new(ScriptedSearchClient::new());
        let mut processor = processor(2, 10);

        let first = processor.submit(changeset(&["1", "2"])).unwrap();
        let second = processor.submit(changeset(&["3"])).unwrap();
        assert_eq!(processor.pending_works(), 3);

        processor.end_batch().unwrap().execute(&context(client.clone())).await;

        assert_eq!(first.await.unwrap().len(), 2);
        let outcomes = second.await.unwrap();
        assert_eq!(outcomes[0].document.id, "3");
        assert_eq!(outcomes[0].kind, WriteOutcomeKind::Created);
        assert_eq!(client.calls().await, vec![ClientCall::Bulk(ids(&["1", "2", "3"]))]);
        assert_eq!(processor.pending_steps(), 0);
        assert_eq!(processor.pending_works(), 0);
    }

    #[tokio::test]
    async fn test_small_changeset_is_not_bulked() {
        let client = Arc::new(ScriptedSearchClient::new());
        let mut processor = processor(2, 10);

        let first = processor.submit(changeset(&["1"])).unwrap();
        let second = processor.submit(changeset(&["2", "3"])).unwrap();

        processor.end_batch().unwrap().execute(&context(client.clone())).await;

        assert!(first.await.is_ok());
        assert!(second.await.is_ok());
        assert_eq!(
            client.calls().await,
            vec![
                ClientCall::Index("1".to_string()),
                ClientCall::Bulk(ids(&["2", "3"]))
            ]
        );
    }

    #[tokio::test]
    async fn test_standalone_work_keeps_its_place() {
        let client = Arc::new(ScriptedSearchClient::new());
        let mut processor = processor(2, 10);

        let changeset = Changeset::new()
            .with_work(ChangesetWork::Bulkable(index_work("1")))
            .with_work(ChangesetWork::Bulkable(index_work("2")))
            .with_work(ChangesetWork::standalone(RefreshWork::new(["books"])))
            .with_work(ChangesetWork::Bulkable(index_work("3")))
            .with_work(ChangesetWork::Bulkable(delete_work("4")));
        let handle = processor.submit(changeset).unwrap();

        processor.end_batch().unwrap().execute(&context(client.clone())).await;

        let outcomes = handle.await.unwrap();
        assert_eq!(outcomes.len(), 4);
        assert_eq!(outcomes[3].kind, WriteOutcomeKind::Deleted);
        assert_eq!(
            client.calls().await,
            vec![
                ClientCall::Bulk(ids(&["1", "2"])),
                ClientCall::Refresh(ids(&["books"])),
                ClientCall::Bulk(ids(&["3", "4"])),
            ]
        );
    }

    #[tokio::test]
    async fn test_forced_refresh_runs_after_changeset() {
        let client = Arc::new(ScriptedSearchClient::new());
        let mut processor = processor(2, 10);

        let refreshed = processor
            .submit(changeset(&["1", "2"]).with_refresh(DocumentRefreshStrategy::Force))
            .unwrap();
        let nothing_to_refresh = processor
            .submit(Changeset::new().with_refresh(DocumentRefreshStrategy::Force))
            .unwrap();

        processor.end_batch().unwrap().execute(&context(client.clone())).await;

        assert_eq!(refreshed.await.unwrap().len(), 2);
        assert!(nothing_to_refresh.await.unwrap().is_empty());
        assert_eq!(
            client.calls().await,
            vec![
                ClientCall::Bulk(ids(&["1", "2"])),
                ClientCall::Refresh(ids(&["books"])),
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_is_reported_to_its_changeset_only() {
        let client = Arc::new(ScriptedSearchClient::new().with_failing_ids(&["2"]));
        let mut processor = processor(2, 10);

        let failing = processor.submit(changeset(&["1", "2"])).unwrap();
        let succeeding = processor.submit(changeset(&["3"])).unwrap();

        processor.end_batch().unwrap().execute(&context(client)).await;

        assert!(matches!(
            failing.await,
            Err(SearchIndexError::BulkItemFailed { status: 400, .. })
        ));
        assert_eq!(succeeding.await.unwrap().len(), 1);
    }

    /// Run a changeset of empty updates and return its outcomes with the
    /// document ids the client received, in order.
    async fn run_empty_updates(min_bulk_size: usize) -> (Vec<WriteOutcome>, Vec<String>) {
        let client = Arc::new(ScriptedSearchClient::new());
        let mut processor = processor(min_bulk_size, 10);

        let changeset = ["1", "2"].iter().fold(Changeset::new(), |changeset, id| {
            changeset.with_work(ChangesetWork::bulkable(UpdateDocumentWork::new(
                DocumentReference::new("books", *id),
                Default::default(),
            )))
        });
        let handle = processor.submit(changeset).unwrap();
        processor.end_batch().unwrap().execute(&context(client.clone())).await;

        let written = client
            .calls()
            .await
            .into_iter()
            .flat_map(|call| match call {
                ClientCall::Update(id) => vec![id],
                ClientCall::Bulk(ids) => ids,
                other => panic!("unexpected call {:?}", other),
            })
            .collect();
        (handle.await.unwrap(), written)
    }

    #[tokio::test]
    async fn test_empty_update_same_whether_bulked_or_not() {
        let (bulked, bulked_writes) = run_empty_updates(2).await;
        let (single, single_writes) = run_empty_updates(3).await;

        assert_eq!(bulked, single);
        assert_eq!(bulked_writes, single_writes);
        assert_eq!(single_writes, ids(&["1", "2"]));
        assert!(single.iter().all(|outcome| outcome.kind == WriteOutcomeKind::Updated));
    }

    #[tokio::test]
    async fn test_discard_abandons_pending_changesets() {
        let mut processor = processor(2, 10);

        let handle = processor.submit(changeset(&["1", "2", "3"])).unwrap();
        processor.discard();

        assert!(matches!(handle.await, Err(SearchIndexError::Abandoned(_))));
        assert_eq!(processor.pending_steps(), 0);
        assert_eq!(processor.pending_works(), 0);
    }
}
