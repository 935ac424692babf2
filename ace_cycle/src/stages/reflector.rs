//! Reflector - critiques the generated answer and scores the bullets it used.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{decode_output, playbook_text, StageContext, StageError, StageEvent};
use crate::cycle::CyclePhase;
use crate::inference::OutputSchema;
use crate::prompt::{Prompt, REFLECTOR_INSTRUCTION};
use crate::session::{keys, StateDelta};
use playbook::{Playbook, TagKind};

/// One bullet re-tagging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulletTag {
    pub id: String,
    pub tag: TagKind,
}

/// Structured result of the reflector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
    pub reasoning: String,
    pub error_identification: String,
    pub root_cause_analysis: String,
    pub correct_approach: String,
    pub key_insight: String,
    #[serde(default)]
    pub bullet_tags: Vec<BulletTag>,
}

pub async fn run(ctx: &StageContext<'_>) -> Result<StageEvent, StageError> {
    let mut playbook = ctx.playbook()?;

    let prompt = Prompt::new(REFLECTOR_INSTRUCTION)
        .with_section("User Query", ctx.text(keys::USER_QUERY))
        .with_section("Generator Output", ctx.text(keys::GENERATOR_OUTPUT))
        .with_optional_section("Ground Truth", ctx.ground_truth())
        .with_section("Current Playbook", playbook_text(&playbook))
        .render();

    let raw = ctx
        .infer(CyclePhase::Critique, prompt, OutputSchema::Reflection)
        .await?;
    let reflection: Reflection = decode_output(CyclePhase::Critique, raw)?;

    let lines = apply_tags(&mut playbook, &reflection.bullet_tags);
    info!(
        requested = reflection.bullet_tags.len(),
        applied = lines.len(),
        "bullets tagged"
    );

    let mut delta = StateDelta::new();
    delta.set(keys::REFLECTOR_OUTPUT, serde_json::to_value(&reflection)?);
    delta.set(ctx.config.playbook_key.clone(), playbook.to_value()?);

    let pretty = if lines.is_empty() {
        "(no changes)".to_string()
    } else {
        lines.join("\n")
    };

    Ok(StageEvent::completed(
        CyclePhase::Critique,
        Some(format!("[Reflector] Bullet Tagging Results:\n{}", pretty)),
        delta,
    ))
}

/// Increment one counter per assignment, in input order.
///
/// Unknown ids are skipped. Returns one `- [id] tag` line per applied tag.
pub fn apply_tags(playbook: &mut Playbook, tags: &[BulletTag]) -> Vec<String> {
    tags.iter()
        .filter_map(|assignment| {
            if playbook.tag(&assignment.id, assignment.tag, 1).is_none() {
                debug!(bullet_id = %assignment.id, "tag for unknown bullet skipped");
                return None;
            }
            Some(format!("- [{}] {}", assignment.id, assignment.tag))
        })
        .collect()
}
