//! Cycle controller - runs Init -> Produce -> Critique -> Curate -> Done.
//!
//! The controller is the only writer to the session. Each stage sees the
//! session as committed by the previous stage and hands back a delta; the
//! delta is committed before the next stage begins. A failing stage yields a
//! diagnostic event and the cycle moves on.

mod report;

pub use report::*;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::CycleConfig;
use crate::inference::InferenceEngine;
use crate::session::SessionState;
use crate::stages::{self, StageContext, StageError, StageEvent};

/// Unique identifier for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvocationId(pub Uuid);

impl InvocationId {
    /// Create a new random invocation ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InvocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stages of a cycle, in execution order. No branching, no retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Init,
    Produce,
    Critique,
    Curate,
    Done,
}

impl CyclePhase {
    /// The stage that follows. `Done` is terminal.
    pub fn next(self) -> CyclePhase {
        match self {
            CyclePhase::Init => CyclePhase::Produce,
            CyclePhase::Produce => CyclePhase::Critique,
            CyclePhase::Critique => CyclePhase::Curate,
            CyclePhase::Curate | CyclePhase::Done => CyclePhase::Done,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CyclePhase::Init => "init",
            CyclePhase::Produce => "produce",
            CyclePhase::Critique => "critique",
            CyclePhase::Curate => "curate",
            CyclePhase::Done => "done",
        }
    }

    /// Display name used as the author of stage messages.
    pub fn author(&self) -> &'static str {
        match self {
            CyclePhase::Init => "StateInitializer",
            CyclePhase::Produce => "Generator",
            CyclePhase::Critique => "Reflector",
            CyclePhase::Curate => "Curator",
            CyclePhase::Done => "Summary",
        }
    }

    /// Lowercase role name used in diagnostics.
    pub fn role(&self) -> &'static str {
        match self {
            CyclePhase::Init => "initializer",
            CyclePhase::Produce => "generator",
            CyclePhase::Critique => "reflector",
            CyclePhase::Curate => "curator",
            CyclePhase::Done => "summary",
        }
    }
}

impl std::fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The external request that triggers a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleRequest {
    pub query: String,

    #[serde(default)]
    pub ground_truth: Option<String>,
}

impl CycleRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ground_truth: None,
        }
    }

    pub fn with_ground_truth(mut self, truth: impl Into<String>) -> Self {
        self.ground_truth = Some(truth.into());
        self
    }
}

/// Sequences the stages of a cycle over a session.
pub struct CycleController {
    config: CycleConfig,
    engine: Arc<dyn InferenceEngine>,
}

impl CycleController {
    pub fn new(config: CycleConfig, engine: Arc<dyn InferenceEngine>) -> Self {
        Self { config, engine }
    }

    /// Create a controller with default configuration.
    pub fn with_defaults(engine: Arc<dyn InferenceEngine>) -> Self {
        Self::new(CycleConfig::default(), engine)
    }

    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    /// Run one full cycle. Always completes; stage failures are reported as
    /// diagnostic events in the returned report.
    pub async fn run<S: SessionState>(&self, session: &mut S, request: CycleRequest) -> CycleReport {
        let invocation_id = InvocationId::new();
        let span = info_span!("cycle", invocation_id = %invocation_id);

        self.run_phases(session, &request, invocation_id)
            .instrument(span)
            .await
    }

    async fn run_phases<S: SessionState>(
        &self,
        session: &mut S,
        request: &CycleRequest,
        invocation_id: InvocationId,
    ) -> CycleReport {
        let mut report = CycleReport::new(invocation_id);
        let mut phase = CyclePhase::Init;

        while phase != CyclePhase::Done {
            self.step(session, request, invocation_id, phase, &mut report)
                .await;
            phase = phase.next();
        }

        if self.config.summarize {
            self.step(session, request, invocation_id, CyclePhase::Done, &mut report)
                .await;
        }

        let ctx = self.context(&*session, invocation_id);
        report.final_answer = stages::summary::final_answer(&ctx);
        report.stats = ctx.playbook().ok().map(|playbook| playbook.stats());

        info!(
            diagnostics = report.diagnostics().count(),
            stats = ?report.stats,
            "cycle finished"
        );
        report
    }

    /// Run one stage and commit its delta.
    async fn step<S: SessionState>(
        &self,
        session: &mut S,
        request: &CycleRequest,
        invocation_id: InvocationId,
        phase: CyclePhase,
        report: &mut CycleReport,
    ) {
        info!(stage = %phase, "stage started");

        let result = {
            let ctx = self.context(&*session, invocation_id);
            Self::run_stage(&ctx, phase, request).await
        };

        let event = match result {
            Ok(event) => event,
            Err(err) => {
                warn!(stage = %phase, error = %err, "stage failed, no changes applied");
                StageEvent::diagnostic(phase, &err)
            }
        };

        session.commit(event.delta.clone());
        report.events.push(event);
    }

    async fn run_stage(
        ctx: &StageContext<'_>,
        phase: CyclePhase,
        request: &CycleRequest,
    ) -> Result<StageEvent, StageError> {
        match phase {
            CyclePhase::Init => stages::init::run(ctx, request),
            CyclePhase::Produce => stages::generator::run(ctx).await,
            CyclePhase::Critique => stages::reflector::run(ctx).await,
            CyclePhase::Curate => stages::curator::run(ctx).await,
            CyclePhase::Done => stages::summary::run(ctx),
        }
    }

    fn context<'a>(
        &'a self,
        session: &'a dyn SessionState,
        invocation_id: InvocationId,
    ) -> StageContext<'a> {
        StageContext {
            session,
            config: &self.config,
            engine: self.engine.as_ref(),
            invocation_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order() {
        let mut phases = vec![CyclePhase::Init];
        while let Some(&last) = phases.last() {
            if last == CyclePhase::Done {
                break;
            }
            phases.push(last.next());
        }

        assert_eq!(
            phases,
            vec![
                CyclePhase::Init,
                CyclePhase::Produce,
                CyclePhase::Critique,
                CyclePhase::Curate,
                CyclePhase::Done
            ]
        );
        assert_eq!(CyclePhase::Done.next(), CyclePhase::Done);
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(CyclePhase::Curate.to_string(), "curate");
        assert_eq!(CyclePhase::Curate.author(), "Curator");
        assert_eq!(CyclePhase::Critique.role(), "reflector");
    }

    #[test]
    fn test_request_builder() {
        let request = CycleRequest::new("2 + 2?").with_ground_truth("4");
        assert_eq!(request.ground_truth.as_deref(), Some("4"));
    }
}
