//! # Search Indexer Shared
//!
//! Plain data types shared by the repository, orchestration and wiring crates.

mod document;
mod outcome;

pub use document::DocumentReference;
pub use outcome::{WriteOutcome, WriteOutcomeKind};
