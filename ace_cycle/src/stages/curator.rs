//! Curator - turns the reflection into a bounded delta and applies it.

use tracing::info;

use super::{decode_output, playbook_text, StageContext, StageError, StageEvent};
use crate::cycle::CyclePhase;
use crate::inference::OutputSchema;
use crate::prompt::{Prompt, CURATOR_INSTRUCTION};
use crate::session::{keys, StateDelta};
use playbook::{DeltaBatch, DeltaReport, OperationOutcome, Playbook};

/// Run the curator. An unparsable batch fails the stage with
/// [`StageError::Malformed`] and leaves the playbook untouched.
pub async fn run(ctx: &StageContext<'_>) -> Result<StageEvent, StageError> {
    let mut playbook = ctx.playbook()?;

    let prompt = Prompt::new(CURATOR_INSTRUCTION)
        .with_section("User Query", ctx.text(keys::USER_QUERY))
        .with_section("Reflector Results", ctx.text(keys::REFLECTOR_OUTPUT))
        .with_section("Current Playbook", playbook_text(&playbook))
        .render();

    let raw = ctx
        .infer(CyclePhase::Curate, prompt, OutputSchema::DeltaBatch)
        .await?;
    let mut batch: DeltaBatch = decode_output(CyclePhase::Curate, raw)?;

    let report = curate(&mut playbook, &mut batch, ctx.config.operation_limit());

    let mut delta = StateDelta::new();
    delta.set(keys::CURATOR_OUTPUT, batch.to_value()?);
    delta.set(ctx.config.playbook_key.clone(), playbook.to_value()?);

    Ok(StageEvent::completed(
        CyclePhase::Curate,
        Some(format_changes(&batch, &report)),
        delta,
    ))
}

/// Truncate the batch to `limit` operations and apply it.
pub fn curate(playbook: &mut Playbook, batch: &mut DeltaBatch, limit: usize) -> DeltaReport {
    let dropped = batch.truncate(limit);
    let mut report = playbook.apply_delta(batch);
    report.truncated += dropped;

    info!(
        reasoning = %batch.reasoning,
        applied = report.applied(),
        skipped = report.skipped(),
        truncated = report.truncated,
        "delta applied"
    );
    report
}

/// Display text for an applied batch, one line per operation.
pub fn format_changes(batch: &DeltaBatch, report: &DeltaReport) -> String {
    let lines: Vec<String> = batch
        .operations
        .iter()
        .zip(&report.outcomes)
        .map(|(op, outcome)| {
            let bullet_ref = match outcome {
                OperationOutcome::Added(id) => format!("[{}]", id),
                _ => op
                    .bullet_id
                    .as_ref()
                    .map(|id| format!("[{}]", id))
                    .unwrap_or_default(),
            };
            let note = match outcome {
                OperationOutcome::NotFound(_) => " (not found)".to_string(),
                OperationOutcome::Skipped(err) => format!(" (skipped: {})", err),
                _ => String::new(),
            };
            format!(
                "- {:6} {:12} {:15} {}{}",
                op.kind,
                op.section.as_deref().unwrap_or(""),
                bullet_ref,
                op.content.as_deref().unwrap_or("(no content)"),
                note
            )
        })
        .collect();

    let pretty = if lines.is_empty() {
        "(no changes)".to_string()
    } else {
        lines.join("\n")
    };
    format!("[Curator] Playbook Changes:\n{}", pretty)
}
