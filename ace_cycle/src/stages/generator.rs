//! Generator - answers the query with the playbook in context.
//!
//! The post-processing step only formats the answer for display; the
//! playbook is not touched.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{decode_output, playbook_text, StageContext, StageError, StageEvent};
use crate::cycle::CyclePhase;
use crate::inference::OutputSchema;
use crate::prompt::{Prompt, GENERATOR_INSTRUCTION};
use crate::session::{keys, StateDelta};

/// Structured result of the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorOutput {
    /// Step-by-step reasoning.
    pub reasoning: Vec<String>,

    /// Ids of the playbook bullets the answer relied on.
    #[serde(default)]
    pub bullet_ids: Vec<String>,

    pub final_answer: String,
}

pub async fn run(ctx: &StageContext<'_>) -> Result<StageEvent, StageError> {
    let playbook = ctx.playbook()?;

    let prompt = Prompt::new(GENERATOR_INSTRUCTION)
        .with_section("User Query", ctx.text(keys::USER_QUERY))
        .with_section("Current Playbook", playbook_text(&playbook))
        .render();

    let raw = ctx
        .infer(CyclePhase::Produce, prompt, OutputSchema::Generator)
        .await?;
    let output: GeneratorOutput = decode_output(CyclePhase::Produce, raw)?;
    info!(
        steps = output.reasoning.len(),
        referenced = output.bullet_ids.len(),
        "answer generated"
    );

    let mut delta = StateDelta::new();
    delta.set(keys::GENERATOR_OUTPUT, serde_json::to_value(&output)?);

    Ok(StageEvent::completed(
        CyclePhase::Produce,
        Some(format_answer(&output)),
        delta,
    ))
}

/// Display text for a generated answer.
pub fn format_answer(output: &GeneratorOutput) -> String {
    let mut text = format!("[Generator] Final Answer:\n{}", output.final_answer);

    if !output.reasoning.is_empty() {
        text.push_str("\n\nReasoning:");
        for (i, step) in output.reasoning.iter().enumerate() {
            text.push_str(&format!("\n{}. {}", i + 1, step));
        }
    }

    let referenced = if output.bullet_ids.is_empty() {
        "(none)".to_string()
    } else {
        output.bullet_ids.join(", ")
    };
    text.push_str(&format!("\n\nReferenced bullets: {}", referenced));

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CycleConfig;
    use crate::cycle::InvocationId;
    use crate::inference::{InferenceError, ScriptedEngine};
    use crate::session::MemorySession;
    use playbook::Playbook;
    use serde_json::json;

    fn session_with_playbook() -> MemorySession {
        let mut playbook = Playbook::new();
        playbook.add("math", "check units", None);
        MemorySession::new()
            .with_value(keys::PLAYBOOK, playbook.to_value().unwrap())
            .with_value(keys::USER_QUERY, json!("How fast is 100m in 10s?"))
    }

    #[tokio::test]
    async fn test_generator_stores_output() {
        let session = session_with_playbook();
        let config = CycleConfig::default();
        let engine = ScriptedEngine::new().reply(
            CyclePhase::Produce,
            json!({
                "reasoning": ["distance / time", "100 / 10 = 10"],
                "bullet_ids": ["math-00001"],
                "final_answer": "10 m/s"
            }),
        );
        let ctx = StageContext {
            session: &session,
            config: &config,
            engine: &engine,
            invocation_id: InvocationId::new(),
        };

        let event = run(&ctx).await.unwrap();

        let stored: GeneratorOutput =
            serde_json::from_value(event.delta.get(keys::GENERATOR_OUTPUT).unwrap().clone()).unwrap();
        assert_eq!(stored.final_answer, "10 m/s");
        assert!(!event.delta.contains(keys::PLAYBOOK));

        let requests = engine.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].schema, OutputSchema::Generator);
        assert_eq!(requests[0].model, "gemini-2.5-flash");
        assert!(requests[0].prompt.contains("[math-00001] check units"));
        assert!(requests[0].prompt.contains("How fast is 100m in 10s?"));
    }

    #[tokio::test]
    async fn test_generator_inference_failure() {
        let session = session_with_playbook();
        let config = CycleConfig::default();
        let engine = ScriptedEngine::new().fail(
            CyclePhase::Produce,
            InferenceError::Timeout("30s".into()),
        );
        let ctx = StageContext {
            session: &session,
            config: &config,
            engine: &engine,
            invocation_id: InvocationId::new(),
        };

        assert!(matches!(
            run(&ctx).await,
            Err(StageError::Inference(InferenceError::Timeout(_)))
        ));
    }

    #[test]
    fn test_format_answer() {
        let text = format_answer(&GeneratorOutput {
            reasoning: vec!["add".into(), "check".into()],
            bullet_ids: vec![],
            final_answer: "4".into(),
        });

        assert_eq!(
            text,
            "[Generator] Final Answer:\n4\n\nReasoning:\n1. add\n2. check\n\nReferenced bullets: (none)"
        );
    }
}
