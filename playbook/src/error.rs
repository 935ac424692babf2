//! Error types for the playbook crate.

use thiserror::Error;

use crate::delta::OperationKind;

/// Errors raised while reading or writing playbook documents.
#[derive(Debug, Error)]
pub enum PlaybookError {
    /// The document is not a valid playbook or delta batch.
    #[error("invalid document: {0}")]
    Document(#[from] serde_json::Error),

    /// A tag category string did not name a known category.
    #[error("unknown tag category '{0}' (expected helpful, harmful or neutral)")]
    UnknownTag(String),
}

/// Reasons a single delta operation is skipped.
///
/// These never abort a batch: the offending operation is dropped and the
/// remaining operations still apply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeltaError {
    #[error("unknown operation type")]
    UnknownKind,

    #[error("{kind} operation is missing required field '{field}'")]
    MissingField {
        kind: OperationKind,
        field: &'static str,
    },
}
