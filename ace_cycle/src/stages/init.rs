//! State initializer - prepares the session for a new cycle.

use serde_json::Value;

use super::{StageContext, StageError, StageEvent};
use crate::cycle::{CyclePhase, CycleRequest};
use crate::session::{keys, StateDelta};
use playbook::Playbook;

/// Record the request, make sure a playbook exists and reset per-cycle outputs.
///
/// Ground truth belongs to the triggering request: it is set when the
/// request carries one and reset to an explicit null otherwise, so a value
/// from an earlier request never reaches this cycle.
pub fn run(ctx: &StageContext<'_>, request: &CycleRequest) -> Result<StageEvent, StageError> {
    let mut delta = StateDelta::new();
    delta.set(keys::USER_QUERY, Value::String(request.query.clone()));

    if !ctx.session.contains(&ctx.config.playbook_key) {
        delta.set(ctx.config.playbook_key.clone(), Playbook::new().to_value()?);
    }

    let ground_truth = match &request.ground_truth {
        Some(truth) => Value::String(truth.clone()),
        None => Value::Null,
    };
    delta.set(keys::GROUND_TRUTH, ground_truth);

    // Outputs of an earlier cycle must not leak into this one.
    for key in [
        keys::GENERATOR_OUTPUT,
        keys::REFLECTOR_OUTPUT,
        keys::CURATOR_OUTPUT,
    ] {
        delta.set(key, Value::Null);
    }

    Ok(StageEvent::completed(CyclePhase::Init, None, delta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CycleConfig;
    use crate::cycle::InvocationId;
    use crate::inference::ScriptedEngine;
    use crate::session::{MemorySession, SessionState};
    use serde_json::json;

    fn init(session: &MemorySession, request: &CycleRequest) -> StateDelta {
        let config = CycleConfig::default();
        let engine = ScriptedEngine::new();
        let ctx = StageContext {
            session,
            config: &config,
            engine: &engine,
            invocation_id: InvocationId::new(),
        };
        run(&ctx, request).unwrap().delta
    }

    #[test]
    fn test_fresh_session() {
        let delta = init(&MemorySession::new(), &CycleRequest::new("What is 2 + 2?"));

        assert_eq!(delta.get(keys::USER_QUERY), Some(&json!("What is 2 + 2?")));
        assert_eq!(delta.get(keys::GROUND_TRUTH), Some(&Value::Null));
        let playbook = Playbook::from_value(delta.get(keys::PLAYBOOK).unwrap().clone()).unwrap();
        assert!(playbook.is_empty());
        assert_eq!(delta.get(keys::GENERATOR_OUTPUT), Some(&Value::Null));
    }

    #[test]
    fn test_existing_playbook_is_kept() {
        let mut playbook = Playbook::new();
        playbook.add("math", "check units", None);
        let session = MemorySession::new()
            .with_value(keys::PLAYBOOK, playbook.to_value().unwrap())
            .with_value(keys::GROUND_TRUTH, json!("4"));

        let delta = init(&session, &CycleRequest::new("again"));

        assert!(!delta.contains(keys::PLAYBOOK));
        assert!(session.contains(keys::PLAYBOOK));
    }

    #[test]
    fn test_previous_ground_truth_is_cleared() {
        let session = MemorySession::new().with_value(keys::GROUND_TRUTH, json!("4"));

        let delta = init(&session, &CycleRequest::new("a different question"));

        assert_eq!(delta.get(keys::GROUND_TRUTH), Some(&Value::Null));
    }

    #[test]
    fn test_supplied_ground_truth() {
        let delta = init(
            &MemorySession::new(),
            &CycleRequest::new("2 + 2?").with_ground_truth("4"),
        );
        assert_eq!(delta.get(keys::GROUND_TRUTH), Some(&json!("4")));
    }
}
