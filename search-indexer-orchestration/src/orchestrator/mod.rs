//! Orchestrator module for the search indexer orchestration.
//!
//! Runs a work processor on a background task: changesets are queued,
//! drained in batches, and every batch is executed as one work sequence.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::config::OrchestratorConfig;
use crate::errors::OrchestrationError;
use crate::processor::{Changeset, ChangesetHandle, WorkProcessor};
use search_indexer_repository::{BulkWorkFactory, WorkExecutionContext};
use search_indexer_shared::WriteOutcome;

type ChangesetReply = Result<Vec<WriteOutcome>, OrchestrationError>;

#[derive(Debug)]
struct ChangesetRequest {
    changeset: Changeset,
    reply: oneshot::Sender<ChangesetReply>,
}

/// Queues changesets on a running orchestrator. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ChangesetSubmitter {
    sender: mpsc::Sender<ChangesetRequest>,
}

impl ChangesetSubmitter {
    /// Queue a changeset and wait for the outcomes of its works.
    ///
    /// Waits for room in the queue when it is full. Fails with
    /// [`OrchestrationError::ShutDown`] once the orchestrator has stopped.
    pub async fn submit(&self, changeset: Changeset) -> ChangesetReply {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(ChangesetRequest { changeset, reply })
            .await
            .map_err(|_| OrchestrationError::ShutDown)?;
        response.await.map_err(|_| OrchestrationError::ShutDown)?
    }
}

/// Orchestrator owning the background task that executes changesets.
///
/// The orchestrator:
/// - Queues changesets from any number of submitters
/// - Batches queued changesets so that their works can share bulks
/// - Executes each batch as one sequence, in submission order
/// - Answers every submitter with its own outcomes
pub struct WorkOrchestrator {
    submitter: ChangesetSubmitter,
    worker: JoinHandle<()>,
}

impl WorkOrchestrator {
    /// Start the background task.
    pub fn start(
        context: WorkExecutionContext,
        config: OrchestratorConfig,
        bulk_work_factory: BulkWorkFactory,
    ) -> Result<Self, OrchestrationError> {
        config.validate()?;
        let processor = WorkProcessor::new(config.bulker, bulk_work_factory)?;
        let (sender, receiver) = mpsc::channel(config.queue_capacity);

        info!(
            min_bulk_size = config.bulker.min_bulk_size,
            max_bulk_size = config.bulker.max_bulk_size,
            queue_capacity = config.queue_capacity,
            "Starting work orchestrator"
        );

        let worker = tokio::spawn(run(
            processor,
            context,
            receiver,
            config.max_changesets_per_batch,
        ));

        Ok(Self {
            submitter: ChangesetSubmitter { sender },
            worker,
        })
    }

    /// Queue a changeset and wait for the outcomes of its works.
    pub async fn submit(&self, changeset: Changeset) -> ChangesetReply {
        self.submitter.submit(changeset).await
    }

    /// A submitter that can be handed to other tasks.
    pub fn submitter(&self) -> ChangesetSubmitter {
        self.submitter.clone()
    }

    /// Stop accepting changesets, finish the queued ones and wait for the task.
    ///
    /// Submitters still held elsewhere keep the queue open until dropped.
    pub async fn stop(self) -> Result<(), OrchestrationError> {
        info!("Stopping work orchestrator");
        drop(self.submitter);
        self.worker
            .await
            .map_err(|e| OrchestrationError::worker(e.to_string()))?;
        info!("Work orchestrator stopped");
        Ok(())
    }
}

async fn run(
    mut processor: WorkProcessor,
    context: WorkExecutionContext,
    mut receiver: mpsc::Receiver<ChangesetRequest>,
    max_changesets_per_batch: usize,
) {
    while let Some(first) = receiver.recv().await {
        let mut batch = vec![first];
        while batch.len() < max_changesets_per_batch {
            match receiver.try_recv() {
                Ok(request) => batch.push(request),
                Err(_) => break,
            }
        }
        process_batch(&mut processor, &context, batch).await;
    }
    debug!("Changeset queue closed");
}

#[instrument(skip_all, fields(changesets = batch.len()))]
async fn process_batch(
    processor: &mut WorkProcessor,
    context: &WorkExecutionContext,
    batch: Vec<ChangesetRequest>,
) {
    let mut pending: Vec<(ChangesetHandle, oneshot::Sender<ChangesetReply>)> =
        Vec::with_capacity(batch.len());
    for request in batch {
        match processor.submit(request.changeset) {
            Ok(handle) => pending.push((handle, request.reply)),
            Err(e) => {
                error!(error = %e, "Failed to submit changeset");
                let _ = request.reply.send(Err(e));
            }
        }
    }

    match processor.end_batch() {
        Ok(sequence) => {
            debug!(steps = sequence.len(), "Executing batch");
            sequence.execute(context).await;
        }
        Err(e) => error!(error = %e, "Failed to end batch"),
    }

    let mut failed = 0;
    for (handle, reply) in pending {
        let outcome = handle.await.map_err(OrchestrationError::from);
        if outcome.is_err() {
            failed += 1;
        }
        // The submitter may have given up waiting.
        let _ = reply.send(outcome);
    }
    if failed > 0 {
        warn!(failed, "Some changesets failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BulkerConfig;
    use crate::processor::{ChangesetWork, DocumentRefreshStrategy};
    use crate::testing::{context, index_work, ClientCall, ScriptedSearchClient};
    use search_indexer_repository::{BulkWork, SearchIndexError};
    use std::sync::Arc;

    fn config(min: usize, max: usize) -> OrchestratorConfig {
        OrchestratorConfig {
            bulker: BulkerConfig::new(min, max),
            ..Default::default()
        }
    }

    fn changeset(ids: &[&str]) -> Changeset {
        ids.iter().fold(Changeset::new(), |changeset, id| {
            changeset.with_work(ChangesetWork::Bulkable(index_work(id)))
        })
    }

    #[tokio::test]
    async fn test_submit_and_stop() {
        let client = Arc::new(ScriptedSearchClient::new());
        let orchestrator =
            WorkOrchestrator::start(context(client.clone()), config(2, 10), BulkWork::factory())
                .unwrap();

        let outcomes = orchestrator
            .submit(changeset(&["1", "2", "3"]).with_refresh(DocumentRefreshStrategy::Force))
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 3);

        orchestrator.stop().await.unwrap();
        assert_eq!(
            client.calls().await,
            vec![
                ClientCall::Bulk(vec!["1".to_string(), "2".to_string(), "3".to_string()]),
                ClientCall::Refresh(vec!["books".to_string()]),
            ]
        );
    }

    #[tokio::test]
    async fn test_queued_changesets_share_a_batch() {
        let client = Arc::new(ScriptedSearchClient::new().with_failing_ids(&["2"]));
        let orchestrator =
            WorkOrchestrator::start(context(client.clone()), config(2, 10), BulkWork::factory())
                .unwrap();
        let other = orchestrator.submitter();

        let (first, second) = tokio::join!(
            orchestrator.submit(changeset(&["1"])),
            other.submit(changeset(&["2"]))
        );

        assert_eq!(first.unwrap().len(), 1);
        assert!(matches!(
            second,
            Err(OrchestrationError::SearchError(SearchIndexError::BulkItemFailed { .. }))
        ));
        assert_eq!(
            client.calls().await,
            vec![ClientCall::Bulk(vec!["1".to_string(), "2".to_string()])]
        );
    }

    #[tokio::test]
    async fn test_stop_waits_for_remaining_submitters() {
        let client = Arc::new(ScriptedSearchClient::new());
        let orchestrator =
            WorkOrchestrator::start(context(client.clone()), config(2, 10), BulkWork::factory())
                .unwrap();
        let submitter = orchestrator.submitter();

        let stopping = tokio::spawn(orchestrator.stop());
        let outcomes = submitter.submit(changeset(&["1"])).await.unwrap();
        assert_eq!(outcomes.len(), 1);

        drop(submitter);
        stopping.await.unwrap().unwrap();
        assert_eq!(client.calls().await, vec![ClientCall::Index("1".to_string())]);
    }

    #[tokio::test]
    async fn test_submit_to_stopped_worker_fails() {
        let client = Arc::new(ScriptedSearchClient::new());
        let orchestrator =
            WorkOrchestrator::start(context(client), config(2, 10), BulkWork::factory()).unwrap();
        let submitter = orchestrator.submitter();

        orchestrator.worker.abort();
        let _ = orchestrator.worker.await;

        assert!(matches!(
            submitter.submit(changeset(&["1"])).await,
            Err(OrchestrationError::ShutDown)
        ));
    }

    #[test]
    fn test_start_rejects_invalid_config() {
        let client = Arc::new(ScriptedSearchClient::new());
        let config = OrchestratorConfig {
            queue_capacity: 0,
            ..Default::default()
        };

        let result = WorkOrchestrator::start(context(client), config, BulkWork::factory());
        assert!(matches!(result, Err(OrchestrationError::InvalidConfig(_))));
    }
}
