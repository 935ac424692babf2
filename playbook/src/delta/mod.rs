//! Delta protocol - bounded, typed mutation requests against a playbook.
//!
//! Curation output arrives as a loosely-shaped document. Every operation is
//! kept in its wire form ([`DeltaOperation`]) until it is applied, at which
//! point it is resolved into a [`Mutation`]. Resolution failures skip that one
//! operation; they never reject the whole batch.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{DeltaError, PlaybookError};

/// Maximum number of operations applied from a single batch.
pub const MAX_OPERATIONS: usize = 3;

/// Operation type as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    #[serde(alias = "add")]
    Add,
    #[serde(alias = "update")]
    Update,
    #[serde(alias = "remove")]
    Remove,
    /// Any type string this protocol does not know, or a missing type.
    #[default]
    #[serde(other)]
    Unknown,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Add => "ADD",
            OperationKind::Update => "UPDATE",
            OperationKind::Remove => "REMOVE",
            OperationKind::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Padding flags apply to the label.
        f.pad(self.as_str())
    }
}

/// A single operation in wire form. Unknown extra fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeltaOperation {
    #[serde(rename = "type", default)]
    pub kind: OperationKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bullet_id: Option<String>,
}

impl DeltaOperation {
    /// An `ADD` with a generated id.
    pub fn add(section: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Add,
            section: Some(section.into()),
            content: Some(content.into()),
            bullet_id: None,
        }
    }

    /// An `ADD` with a caller-supplied id.
    pub fn add_with_id(
        section: impl Into<String>,
        content: impl Into<String>,
        bullet_id: impl Into<String>,
    ) -> Self {
        Self {
            bullet_id: Some(bullet_id.into()),
            ..Self::add(section, content)
        }
    }

    pub fn update(bullet_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Update,
            section: None,
            content: Some(content.into()),
            bullet_id: Some(bullet_id.into()),
        }
    }

    pub fn remove(bullet_id: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Remove,
            section: None,
            content: None,
            bullet_id: Some(bullet_id.into()),
        }
    }

    /// Check required fields for this operation's kind.
    ///
    /// `ADD` needs a section (content defaults to empty), `UPDATE` needs an id
    /// and content, `REMOVE` needs an id.
    pub fn resolve(&self) -> Result<Mutation, DeltaError> {
        let missing = |field| DeltaError::MissingField {
            kind: self.kind,
            field,
        };

        match self.kind {
            OperationKind::Add => Ok(Mutation::Add {
                section: self.section.clone().ok_or_else(|| missing("section"))?,
                content: self.content.clone().unwrap_or_default(),
                bullet_id: self.bullet_id.clone(),
            }),
            OperationKind::Update => Ok(Mutation::Update {
                bullet_id: self.bullet_id.clone().ok_or_else(|| missing("bullet_id"))?,
                content: self.content.clone().ok_or_else(|| missing("content"))?,
            }),
            OperationKind::Remove => Ok(Mutation::Remove {
                bullet_id: self.bullet_id.clone().ok_or_else(|| missing("bullet_id"))?,
            }),
            OperationKind::Unknown => Err(DeltaError::UnknownKind),
        }
    }
}

/// A validated mutation, ready to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Add {
        section: String,
        content: String,
        bullet_id: Option<String>,
    },
    Update {
        bullet_id: String,
        content: String,
    },
    Remove {
        bullet_id: String,
    },
}

/// Curator reasoning plus an ordered list of operations.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeltaBatch {
    pub reasoning: String,

    #[serde(default)]
    pub operations: Vec<DeltaOperation>,
}

impl DeltaBatch {
    /// Create a batch with no operations.
    pub fn new(reasoning: impl Into<String>) -> Self {
        Self {
            reasoning: reasoning.into(),
            operations: Vec::new(),
        }
    }

    /// Append an operation.
    pub fn with_operation(mut self, operation: DeltaOperation) -> Self {
        self.operations.push(operation);
        self
    }

    /// Parse a batch from JSON text.
    pub fn from_json(text: &str) -> Result<Self, PlaybookError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parse a batch from an already-decoded JSON value.
    pub fn from_value(value: Value) -> Result<Self, PlaybookError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_value(&self) -> Result<Value, PlaybookError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Truncate to at most `limit` operations, never more than [`MAX_OPERATIONS`].
    ///
    /// Returns the number of operations dropped.
    pub fn truncate(&mut self, limit: usize) -> usize {
        let limit = limit.min(MAX_OPERATIONS);
        let dropped = self.operations.len().saturating_sub(limit);
        self.operations.truncate(limit);
        dropped
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }
}

/// What happened to one operation of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    Added(String),
    Updated(String),
    Removed(String),
    /// The operation targeted an id that does not exist.
    NotFound(String),
    Skipped(DeltaError),
}

impl OperationOutcome {
    /// Whether the playbook was changed.
    pub fn is_applied(&self) -> bool {
        matches!(
            self,
            OperationOutcome::Added(_) | OperationOutcome::Updated(_) | OperationOutcome::Removed(_)
        )
    }
}

/// Per-operation results of applying a batch, in batch order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeltaReport {
    pub outcomes: Vec<OperationOutcome>,
    /// Operations beyond the bound that were never looked at.
    pub truncated: usize,
}

impl DeltaReport {
    pub fn applied(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_applied()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.applied()
    }
}
