//! # Search Indexer Orchestration
//!
//! This crate turns individual index works into an ordered sequence of
//! backend calls, grouping bulkable works into bulk requests whenever that is
//! worth it.
//!
//! ## Architecture
//!
//! 1. **Deferred**: write-once cells carrying the eventual outcome of a step
//! 2. **Sequence**: records execution steps and later runs them in order
//! 3. **Bulker**: decides which works are bulked and registers them with the sequence
//! 4. **Processor**: feeds changesets of works through the bulker
//! 5. **Orchestrator**: runs batches of changesets on a background task

pub mod bulker;
pub mod config;
pub mod deferred;
pub mod errors;
pub mod orchestrator;
pub mod processor;
pub mod sequence;

#[cfg(test)]
pub(crate) mod testing;

pub use bulker::WorkBulker;
pub use config::{BulkerConfig, OrchestratorConfig};
pub use deferred::{
    completion_pair, deferred, CompletionHandle, CompletionLink, Eventual, Outcome, Promise,
};
pub use errors::OrchestrationError;
pub use orchestrator::{ChangesetSubmitter, WorkOrchestrator};
pub use processor::{
    Changeset, ChangesetHandle, ChangesetWork, DocumentRefreshStrategy, WorkProcessor,
};
pub use sequence::{
    BulkResultExtractionStep, BulkWorkRef, DefaultWorkSequenceBuilder, WorkSequence,
    WorkSequenceBuilder,
};
