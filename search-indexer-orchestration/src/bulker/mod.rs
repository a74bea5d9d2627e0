//! Work bulker.
//!
//! Groups bulkable works into bulk requests when that is worth it, and
//! registers them with a sequence builder so that every work keeps its own
//! completion handle whether it ends up bulked or not.
//!
//! # Lifecycle of a group
//!
//! ```text
//!   Empty --add--> Accumulating --add_works_to_sequence--> AwaitingFinalize
//!                       |                                    |        ^
//!                       | (fewer than min_bulk_size works:   add  add_works_to_sequence
//!                       |  executed one by one)              v        |
//!                       +--> Empty                          Registered
//!
//!   AwaitingFinalize --finalize_bulk_work--> Empty
//! ```
//!
//! Once a bulk was started for a group, every later work of that group is
//! extracted from the same bulk. The group never falls back to individual
//! executions, even if the works added since are fewer than `min_bulk_size`.

use std::fmt;
use std::mem;
use std::sync::Arc;
use tracing::{debug, error};

use crate::config::BulkerConfig;
use crate::deferred::{completion_pair, deferred, CompletionHandle, CompletionLink, Eventual, Promise};
use crate::errors::OrchestrationError;
use crate::sequence::{BulkWorkRef, WorkSequenceBuilder};
use search_indexer_repository::{BulkResult, BulkWorkFactory, BulkableWork};
use search_indexer_shared::WriteOutcome;

/// A work waiting for its group to be sequenced, with the link to its handle.
///
/// The link is taken once the work is registered with the sequence builder.
struct PendingItem {
    work: Arc<dyn BulkableWork>,
    link: Option<CompletionLink<WriteOutcome>>,
}

/// The bulk of the current group, registered but not built yet.
struct PendingBulk {
    work: Promise<BulkWorkRef>,
    result: Eventual<Arc<BulkResult>>,
}

#[derive(Default)]
enum BulkState {
    /// No pending works.
    #[default]
    Empty,
    /// Pending works, none of them registered.
    Accumulating,
    /// A bulk was started; works from `first_unsequenced` on are not registered yet.
    Registered {
        bulk: PendingBulk,
        first_unsequenced: usize,
    },
    /// Every pending work is registered; the bulk waits to be built.
    AwaitingFinalize { bulk: PendingBulk },
}

/// Turns a stream of bulkable works into bulk and non-bulk sequence steps.
///
/// Single writer: all operations take `&mut self` and none of them performs
/// I/O. Works execute later, when the sequence built by `B` runs.
pub struct WorkBulker<B> {
    sequence_builder: B,
    bulk_work_factory: BulkWorkFactory,
    config: BulkerConfig,
    items: Vec<PendingItem>,
    state: BulkState,
}

impl<B: WorkSequenceBuilder> WorkBulker<B> {
    /// Create a bulker registering works with `sequence_builder`.
    pub fn new(
        sequence_builder: B,
        bulk_work_factory: BulkWorkFactory,
        config: BulkerConfig,
    ) -> Result<Self, OrchestrationError> {
        config.validate()?;
        Ok(Self {
            sequence_builder,
            bulk_work_factory,
            config,
            items: Vec::new(),
            state: BulkState::Empty,
        })
    }

    /// Add a work to the current group.
    ///
    /// When the group reaches `max_bulk_size`, it is sequenced and its bulk
    /// built right away; the next work starts a new group.
    pub fn add(&mut self, work: Arc<dyn BulkableWork>) -> CompletionHandle<WriteOutcome> {
        let (link, handle) = completion_pair();
        let position = self.items.len();
        self.items.push(PendingItem {
            work,
            link: Some(link),
        });

        self.state = match mem::take(&mut self.state) {
            BulkState::Empty | BulkState::Accumulating => BulkState::Accumulating,
            BulkState::AwaitingFinalize { bulk } => BulkState::Registered {
                bulk,
                first_unsequenced: position,
            },
            registered @ BulkState::Registered { .. } => registered,
        };

        if self.items.len() >= self.config.max_bulk_size {
            debug!(items = self.items.len(), "Bulk is full, flushing");
            self.add_works_to_sequence();
            if let Err(e) = self.finalize_bulk_work() {
                error!(error = %e, "Failed to finalize a full bulk");
                debug_assert!(false, "full bulk could not be finalized: {}", e);
            }
        }

        handle
    }

    /// Register every work added since the last call with the sequence builder.
    ///
    /// Returns `true` if works were registered as part of a bulk. Returns
    /// `false` if there was nothing to register, or if the group was too small
    /// to bulk: its works are then registered as individual executions and the
    /// group is cleared.
    pub fn add_works_to_sequence(&mut self) -> bool {
        let (bulk, first_unsequenced) = match mem::take(&mut self.state) {
            BulkState::Empty => return false,
            BulkState::AwaitingFinalize { bulk } => {
                self.state = BulkState::AwaitingFinalize { bulk };
                return false;
            }
            BulkState::Accumulating if self.items.len() < self.config.min_bulk_size => {
                self.add_non_bulk_executions();
                return false;
            }
            BulkState::Accumulating => (self.start_bulk(), 0),
            BulkState::Registered {
                bulk,
                first_unsequenced,
            } => (bulk, first_unsequenced),
        };

        let extraction = self
            .sequence_builder
            .add_bulk_result_extraction(bulk.result.clone());
        for (index, item) in self.items.iter_mut().enumerate().skip(first_unsequenced) {
            let outcome = extraction.add(item.work.clone(), index);
            if let Some(link) = item.link.take() {
                link.follow(outcome);
            }
        }

        debug!(
            registered = self.items.len() - first_unsequenced,
            total = self.items.len(),
            "Registered works with the pending bulk"
        );

        self.state = BulkState::AwaitingFinalize { bulk };
        true
    }

    /// Build the bulk of the current group and hand it to the sequence.
    ///
    /// Does nothing when no bulk was started. Fails with a protocol violation,
    /// leaving the bulker untouched, if some works were not registered with
    /// [`add_works_to_sequence`](Self::add_works_to_sequence) first.
    pub fn finalize_bulk_work(&mut self) -> Result<(), OrchestrationError> {
        match mem::take(&mut self.state) {
            BulkState::Empty => Ok(()),
            BulkState::AwaitingFinalize { bulk } => {
                let works: Vec<Arc<dyn BulkableWork>> =
                    self.items.iter().map(|item| item.work.clone()).collect();
                debug!(items = works.len(), "Finalizing bulk work");

                bulk.work.succeed((self.bulk_work_factory)(works));
                self.reset();
                Ok(())
            }
            state => {
                let unsequenced = match &state {
                    BulkState::Registered {
                        first_unsequenced, ..
                    } => self.items.len() - first_unsequenced,
                    _ => self.items.len(),
                };
                self.state = state;
                Err(OrchestrationError::protocol_violation(format!(
                    "Some works haven't been added to the sequence builder ({} of {})",
                    unsequenced,
                    self.items.len()
                )))
            }
        }
    }

    /// Discard the current group.
    ///
    /// Handles of discarded works, and outcomes of a discarded bulk, resolve
    /// as abandoned.
    pub fn reset(&mut self) {
        self.items.clear();
        self.state = BulkState::Empty;
    }

    /// Number of works in the current group.
    pub fn pending_count(&self) -> usize {
        self.items.len()
    }

    /// Number of leading works of the current group registered with the sequence builder.
    pub fn first_unsequenced_index(&self) -> usize {
        match self.state {
            BulkState::Empty | BulkState::Accumulating => 0,
            BulkState::Registered {
                first_unsequenced, ..
            } => first_unsequenced,
            BulkState::AwaitingFinalize { .. } => self.items.len(),
        }
    }

    /// Whether a bulk was started for the current group.
    pub fn has_pending_bulk(&self) -> bool {
        matches!(
            self.state,
            BulkState::Registered { .. } | BulkState::AwaitingFinalize { .. }
        )
    }

    pub fn config(&self) -> &BulkerConfig {
        &self.config
    }

    pub fn sequence_builder(&self) -> &B {
        &self.sequence_builder
    }

    pub fn sequence_builder_mut(&mut self) -> &mut B {
        &mut self.sequence_builder
    }

    fn start_bulk(&mut self) -> PendingBulk {
        let (work, bulk_work) = deferred::<BulkWorkRef>();
        let result = self.sequence_builder.add_bulk_execution(bulk_work);
        PendingBulk { work, result }
    }

    fn add_non_bulk_executions(&mut self) {
        debug!(
            items = self.items.len(),
            min_bulk_size = self.config.min_bulk_size,
            "Too few works to bulk, executing them one by one"
        );
        for item in self.items.drain(..) {
            let outcome: Eventual<WriteOutcome> =
                self.sequence_builder.add_non_bulk_execution(item.work);
            if let Some(link) = item.link {
                link.follow(outcome);
            }
        }
        self.state = BulkState::Empty;
    }
}

impl<B: fmt::Debug> fmt::Debug for WorkBulker<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            BulkState::Empty => "empty",
            BulkState::Accumulating => "accumulating",
            BulkState::Registered { .. } => "registered",
            BulkState::AwaitingFinalize { .. } => "awaiting_finalize",
        };
        f.debug_struct("WorkBulker")
            .field("sequence_builder", &self.sequence_builder)
            .field("config", &self.config)
            .field("pending", &self.items.len())
            .field("state", &state)
            .finish()
    }
}
