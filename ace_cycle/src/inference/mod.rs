//! Inference collaborator - turns a prompt plus an output schema into a
//! structured result.
//!
//! The engine itself (model hosting, transport, retries, timeouts) lives
//! outside this crate. Stages only see the [`InferenceEngine`] trait.

mod schema;
mod scripted;

pub use schema::*;
pub use scripted::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::cycle::CyclePhase;

/// Errors reported by an inference engine.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InferenceError {
    /// The request could not be completed (network, provider error).
    #[error("request failed: {0}")]
    Request(String),

    /// The engine gave up waiting for the model.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The model declined to produce output.
    #[error("refused: {0}")]
    Refused(String),
}

/// One structured-output request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
    /// The stage issuing the request.
    pub phase: CyclePhase,

    pub model: String,

    pub prompt: String,

    pub schema: OutputSchema,
}

/// A model that produces structured output.
///
/// The result may be a JSON object or a JSON string holding the object;
/// stages decode both.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    async fn infer(&self, request: &InferenceRequest) -> Result<Value, InferenceError>;
}
