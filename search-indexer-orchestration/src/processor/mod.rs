//! Processor module for the search indexer orchestration.
//!
//! Feeds changesets of works through a bulker and builds the resulting
//! sequence of steps, one batch of changesets at a time.

mod changeset;
mod work_processor;

pub use changeset::{Changeset, ChangesetHandle, ChangesetWork, DocumentRefreshStrategy};
pub use work_processor::WorkProcessor;
