//! Pipeline stages.
//!
//! Each stage reads a session snapshot through a [`StageContext`], makes at
//! most one inference call, runs one deterministic post-processing step and
//! returns a [`StageEvent`] whose delta the controller commits.

pub mod curator;
pub mod generator;
pub mod init;
pub mod reflector;
pub mod summary;

pub use curator::{curate, format_changes};
pub use generator::{format_answer, GeneratorOutput};
pub use reflector::{apply_tags, BulletTag, Reflection};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::CycleConfig;
use crate::cycle::{CyclePhase, InvocationId};
use crate::inference::{InferenceEngine, InferenceError, InferenceRequest, OutputSchema};
use crate::prompt::{value_text, EMPTY_PLAYBOOK};
use crate::session::{keys, SessionState, StateDelta};
use playbook::{Playbook, PlaybookError};

/// Errors that stop a single stage. The cycle itself always continues.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("inference failed: {0}")]
    Inference(#[from] InferenceError),

    /// The engine answered, but not with the expected structure.
    #[error("Error parsing {role} output: {reason}")]
    Malformed { role: &'static str, reason: String },

    #[error("session state is missing '{0}'")]
    MissingState(String),

    #[error("persisted playbook is unreadable: {0}")]
    Playbook(#[from] PlaybookError),

    #[error("failed to encode stage output: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Whether a stage finished normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Completed,
    /// The stage failed; its delta is empty and nothing was changed.
    Diagnostic,
}

/// The result of one stage: a display message and the state it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEvent {
    pub phase: CyclePhase,
    pub kind: EventKind,
    pub message: Option<String>,
    pub delta: StateDelta,
}

impl StageEvent {
    pub fn completed(phase: CyclePhase, message: Option<String>, delta: StateDelta) -> Self {
        Self {
            phase,
            kind: EventKind::Completed,
            message,
            delta,
        }
    }

    /// A report for a failed stage. Carries no state changes.
    pub fn diagnostic(phase: CyclePhase, error: &StageError) -> Self {
        Self {
            phase,
            kind: EventKind::Diagnostic,
            message: Some(format!("[{}] {}\nNo changes applied.", phase.author(), error)),
            delta: StateDelta::new(),
        }
    }

    pub fn author(&self) -> &'static str {
        self.phase.author()
    }

    pub fn is_diagnostic(&self) -> bool {
        self.kind == EventKind::Diagnostic
    }
}

/// Read-only view handed to a stage.
pub struct StageContext<'a> {
    pub session: &'a dyn SessionState,
    pub config: &'a CycleConfig,
    pub engine: &'a dyn InferenceEngine,
    pub invocation_id: InvocationId,
}

impl StageContext<'_> {
    /// Load the persisted playbook.
    pub fn playbook(&self) -> Result<Playbook, StageError> {
        let key = &self.config.playbook_key;
        let value = self
            .session
            .get(key)
            .ok_or_else(|| StageError::MissingState(key.clone()))?;
        Ok(Playbook::from_value(value.clone())?)
    }

    /// A session value as prompt text.
    pub fn text(&self, key: &str) -> String {
        value_text(self.session.get(key))
    }

    /// The ground truth, if one was supplied.
    pub fn ground_truth(&self) -> Option<String> {
        match self.session.get(keys::GROUND_TRUTH) {
            None | Some(Value::Null) => None,
            value => Some(value_text(value)),
        }
    }

    /// Call the inference engine with the model configured for `phase`.
    pub async fn infer(
        &self,
        phase: CyclePhase,
        prompt: String,
        schema: OutputSchema,
    ) -> Result<Value, StageError> {
        let request = InferenceRequest {
            phase,
            model: self.config.model_for(phase).unwrap_or_default().to_string(),
            prompt,
            schema,
        };
        debug!(
            stage = %phase,
            model = %request.model,
            schema = schema.name(),
            prompt_len = request.prompt.len(),
            "inference request"
        );
        Ok(self.engine.infer(&request).await?)
    }
}

/// Playbook text for prompts.
pub fn playbook_text(playbook: &Playbook) -> String {
    if playbook.is_empty() {
        EMPTY_PLAYBOOK.to_string()
    } else {
        playbook.as_prompt()
    }
}

/// Decode a structured result. Strings are parsed as JSON, tolerating a
/// surrounding Markdown code fence.
pub fn decode_output<T: DeserializeOwned>(phase: CyclePhase, raw: Value) -> Result<T, StageError> {
    let decoded = match raw {
        Value::String(text) => serde_json::from_str(strip_code_fence(&text)),
        other => serde_json::from_value(other),
    };

    decoded.map_err(|err| StageError::Malformed {
        role: phase.role(),
        reason: err.to_string(),
    })
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an info string such as `json`.
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use playbook::DeltaBatch;
    use serde_json::json;

    #[test]
    fn test_decode_object_and_string() {
        let from_object: DeltaBatch =
            decode_output(CyclePhase::Curate, json!({"reasoning": "r", "operations": []})).unwrap();
        let from_string: DeltaBatch = decode_output(
            CyclePhase::Curate,
            json!("{\"reasoning\": \"r\", \"operations\": []}"),
        )
        .unwrap();
        assert_eq!(from_object, from_string);
    }

    #[test]
    fn test_decode_fenced_string() {
        let batch: DeltaBatch = decode_output(
            CyclePhase::Curate,
            json!("```json\n{\"reasoning\": \"fenced\", \"operations\": []}\n```"),
        )
        .unwrap();
        assert_eq!(batch.reasoning, "fenced");
    }

    #[test]
    fn test_decode_garbage_is_malformed() {
        let err = decode_output::<DeltaBatch>(CyclePhase::Curate, json!("no changes needed"))
            .unwrap_err();
        assert!(matches!(err, StageError::Malformed { role: "curator", .. }));
        assert!(err.to_string().starts_with("Error parsing curator output:"));
    }

    #[test]
    fn test_diagnostic_message() {
        let err = StageError::Malformed {
            role: "curator",
            reason: "expected value".into(),
        };
        let event = StageEvent::diagnostic(CyclePhase::Curate, &err);

        assert!(event.is_diagnostic());
        assert!(event.delta.is_empty());
        assert_eq!(
            event.message.as_deref(),
            Some("[Curator] Error parsing curator output: expected value\nNo changes applied.")
        );
    }

    #[test]
    fn test_playbook_text_placeholder() {
        let mut playbook = Playbook::new();
        assert_eq!(playbook_text(&playbook), EMPTY_PLAYBOOK);
        playbook.add("math", "check units", None);
        assert!(playbook_text(&playbook).starts_with("## math"));
    }
}
