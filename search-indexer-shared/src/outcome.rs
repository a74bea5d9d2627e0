//! Per-document write outcomes.

use serde::{Deserialize, Serialize};

use crate::DocumentReference;

/// What the backend did with a single document write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcomeKind {
    Created,
    Updated,
    Deleted,
    /// The write was accepted but changed nothing.
    Noop,
    /// A delete targeted a document that did not exist.
    NotFound,
}

impl WriteOutcomeKind {
    /// Parse the `result` field the backend reports for a write.
    pub fn from_result(result: &str) -> Option<Self> {
        match result {
            "created" => Some(Self::Created),
            "updated" => Some(Self::Updated),
            "deleted" => Some(Self::Deleted),
            "noop" => Some(Self::Noop),
            "not_found" => Some(Self::NotFound),
            _ => None,
        }
    }
}

/// Successful outcome of writing one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOutcome {
    /// The document that was written.
    pub document: DocumentReference,
    /// What happened to it.
    pub kind: WriteOutcomeKind,
    /// Document version after the write, when the backend reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

impl WriteOutcome {
    pub fn new(document: DocumentReference, kind: WriteOutcomeKind) -> Self {
        Self {
            document,
            kind,
            version: None,
        }
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_result() {
        assert_eq!(
            WriteOutcomeKind::from_result("created"),
            Some(WriteOutcomeKind::Created)
        );
        assert_eq!(
            WriteOutcomeKind::from_result("not_found"),
            Some(WriteOutcomeKind::NotFound)
        );
        assert_eq!(WriteOutcomeKind::from_result("exploded"), None);
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = WriteOutcome::new(DocumentReference::new("books", "1"), WriteOutcomeKind::Noop)
            .with_version(3);

        let value = serde_json::to_value(&outcome).unwrap();

        assert_eq!(value["kind"], "noop");
        assert_eq!(value["version"], 3);
        assert_eq!(value["document"]["id"], "1");
    }
}
