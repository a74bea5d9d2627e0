//! The default sequence builder and the sequence it builds.

use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::mem;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::{BulkResultExtractionStep, BulkWorkRef, WorkSequenceBuilder};
use crate::deferred::{deferred, Eventual, Promise};
use search_indexer_repository::{BulkResult, BulkableWork, SearchWork, WorkExecutionContext};
use search_indexer_shared::WriteOutcome;

type ExecutionFn = Box<dyn FnOnce(WorkExecutionContext) -> BoxFuture<'static, ()> + Send>;

enum SequenceStep {
    /// A standalone work; completes its own promise when run.
    Execution(ExecutionFn),
    BulkExecution {
        bulk_work: Eventual<BulkWorkRef>,
        result: Promise<Arc<BulkResult>>,
    },
    Extraction(BulkExtractionStep),
}

impl SequenceStep {
    fn name(&self) -> &'static str {
        match self {
            SequenceStep::Execution(_) => "execution",
            SequenceStep::BulkExecution { .. } => "bulk_execution",
            SequenceStep::Extraction(_) => "extraction",
        }
    }
}

/// Item extractions bound to one eventual bulk result.
struct BulkExtractionStep {
    bulk_result: Eventual<Arc<BulkResult>>,
    extractions: Vec<(Arc<dyn BulkableWork>, usize, Promise<WriteOutcome>)>,
}

impl BulkResultExtractionStep for BulkExtractionStep {
    fn add(&mut self, work: Arc<dyn BulkableWork>, index: usize) -> Eventual<WriteOutcome> {
        let (promise, outcome) = deferred();
        self.extractions.push((work, index, promise));
        outcome
    }
}

/// Records steps in memory and builds them into a [`WorkSequence`].
///
/// The latest extraction step stays open for `add` calls until another step
/// is registered or the sequence is built.
#[derive(Default)]
pub struct DefaultWorkSequenceBuilder {
    steps: Vec<SequenceStep>,
    open_extraction: Option<BulkExtractionStep>,
}

impl DefaultWorkSequenceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of steps registered since the last build.
    pub fn len(&self) -> usize {
        self.steps.len() + usize::from(self.open_extraction.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take every registered step, leaving the builder empty.
    pub fn build(&mut self) -> WorkSequence {
        self.close_extraction();
        WorkSequence {
            steps: mem::take(&mut self.steps),
        }
    }

    /// Drop every registered step. Their outcomes resolve as abandoned.
    pub fn clear(&mut self) {
        self.open_extraction = None;
        self.steps.clear();
    }

    fn close_extraction(&mut self) {
        if let Some(step) = self.open_extraction.take() {
            self.steps.push(SequenceStep::Extraction(step));
        }
    }

    fn push(&mut self, step: SequenceStep) {
        self.close_extraction();
        self.steps.push(step);
    }
}

impl fmt::Debug for DefaultWorkSequenceBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultWorkSequenceBuilder")
            .field("steps", &self.len())
            .finish()
    }
}

impl WorkSequenceBuilder for DefaultWorkSequenceBuilder {
    fn add_non_bulk_execution<T, W>(&mut self, work: W) -> Eventual<T>
    where
        T: Clone + Send + Sync + 'static,
        W: SearchWork<T> + 'static,
    {
        let (promise, outcome) = deferred();
        let run: ExecutionFn = Box::new(move |context: WorkExecutionContext| {
            async move {
                let result = work.execute(&context).await;
                if let Err(ref e) = result {
                    debug!(error = %e, work = ?work, "Work failed");
                }
                promise.complete(result);
            }
            .boxed()
        });
        self.push(SequenceStep::Execution(run));
        outcome
    }

    fn add_bulk_execution(
        &mut self,
        bulk_work: Eventual<BulkWorkRef>,
    ) -> Eventual<Arc<BulkResult>> {
        let (result, bulk_result) = deferred();
        self.push(SequenceStep::BulkExecution { bulk_work, result });
        bulk_result
    }

    fn add_bulk_result_extraction(
        &mut self,
        bulk_result: Eventual<Arc<BulkResult>>,
    ) -> &mut dyn BulkResultExtractionStep {
        self.close_extraction();
        self.open_extraction.insert(BulkExtractionStep {
            bulk_result,
            extractions: Vec::new(),
        })
    }
}

/// A built sequence of steps, ready to run.
///
/// Dropping a sequence without executing it resolves every outcome it would
/// have produced as abandoned.
pub struct WorkSequence {
    steps: Vec<SequenceStep>,
}

impl WorkSequence {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in registration order.
    ///
    /// A step starts only once the previous one has completed. Failures are
    /// delivered through the outcomes handed out at registration time and
    /// never stop the sequence.
    #[instrument(skip_all, fields(steps = self.steps.len()))]
    pub async fn execute(self, context: &WorkExecutionContext) {
        for step in self.steps {
            debug!(step = step.name(), "Running sequence step");
            match step {
                SequenceStep::Execution(run) => run(context.clone()).await,
                SequenceStep::BulkExecution { bulk_work, result } => {
                    let outcome = match bulk_work.await {
                        Ok(work) => work.execute(context).await.map(Arc::new),
                        Err(e) => Err(e),
                    };
                    if let Err(ref e) = outcome {
                        warn!(error = %e, "Bulk execution failed");
                    }
                    result.complete(outcome);
                }
                SequenceStep::Extraction(step) => {
                    let bulk_result = step.bulk_result.await;
                    for (work, index, promise) in step.extractions {
                        let outcome = match bulk_result {
                            Ok(ref result) => work.extract(result, index),
                            Err(ref e) => Err(e.clone()),
                        };
                        promise.complete(outcome);
                    }
                }
            }
        }
    }
}

impl fmt::Debug for WorkSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps: Vec<&str> = self.steps.iter().map(SequenceStep::name).collect();
        f.debug_struct("WorkSequence").field("steps", &steps).finish()
    }
}
