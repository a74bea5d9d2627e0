//! Document addressing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a single document in the search backend.
///
/// Every index mutation targets exactly one document, addressed by the index
/// it lives in, its id, and an optional routing key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentReference {
    /// Name (or alias) of the target index.
    pub index: String,
    /// The document id inside the index.
    pub id: String,
    /// Optional custom routing key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing: Option<String>,
}

impl DocumentReference {
    /// Create a reference to the document `id` in `index`.
    pub fn new(index: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            id: id.into(),
            routing: None,
        }
    }

    /// Set the routing key.
    pub fn with_routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }
}

impl fmt::Display for DocumentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.index, self.id)
    }
}
