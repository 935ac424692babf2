//! The outcome of a cycle.

use serde::{Deserialize, Serialize};

use super::{CyclePhase, InvocationId};
use crate::stages::StageEvent;
use playbook::PlaybookStats;

/// Events emitted by a cycle, in stage order, plus the final state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub invocation_id: InvocationId,

    pub events: Vec<StageEvent>,

    /// The generator's answer, if that stage succeeded.
    pub final_answer: Option<String>,

    /// Playbook statistics after the last stage.
    pub stats: Option<PlaybookStats>,
}

impl CycleReport {
    pub fn new(invocation_id: InvocationId) -> Self {
        Self {
            invocation_id,
            events: Vec::new(),
            final_answer: None,
            stats: None,
        }
    }

    /// The event a stage produced.
    pub fn event(&self, phase: CyclePhase) -> Option<&StageEvent> {
        self.events.iter().find(|event| event.phase == phase)
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &StageEvent> {
        self.events.iter().filter(|event| event.is_diagnostic())
    }

    /// Display messages in stage order.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.events
            .iter()
            .filter_map(|event| event.message.as_deref())
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics().next().is_none()
    }
}
