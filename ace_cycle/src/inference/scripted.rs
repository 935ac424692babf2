//! A replaying inference engine for tests and offline runs.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::{InferenceEngine, InferenceError, InferenceRequest};
use crate::cycle::CyclePhase;

type Reply = Result<Value, InferenceError>;

/// Replays queued replies per stage and records every request it sees.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    replies: Mutex<HashMap<CyclePhase, VecDeque<Reply>>>,
    requests: Mutex<Vec<InferenceRequest>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a structured reply for a stage.
    pub fn reply(self, phase: CyclePhase, value: Value) -> Self {
        self.push(phase, Ok(value))
    }

    /// Queue a failure for a stage.
    pub fn fail(self, phase: CyclePhase, error: InferenceError) -> Self {
        self.push(phase, Err(error))
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<InferenceRequest> {
        lock(&self.requests).clone()
    }

    fn push(self, phase: CyclePhase, reply: Reply) -> Self {
        lock(&self.replies).entry(phase).or_default().push_back(reply);
        self
    }
}

#[async_trait]
impl InferenceEngine for ScriptedEngine {
    async fn infer(&self, request: &InferenceRequest) -> Result<Value, InferenceError> {
        lock(&self.requests).push(request.clone());
        debug!(stage = %request.phase, model = %request.model, "scripted inference");

        lock(&self.replies)
            .get_mut(&request.phase)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(InferenceError::Request(format!(
                    "no scripted reply for stage {}",
                    request.phase
                )))
            })
    }
}

// A panicked test thread must not hide the queue from the others.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
