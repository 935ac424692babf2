//! Summary - reports the final answer and playbook statistics. Never mutates.

use super::{decode_output, GeneratorOutput, StageContext, StageError, StageEvent};
use crate::cycle::CyclePhase;
use crate::prompt::UNAVAILABLE;
use crate::session::{keys, StateDelta};

pub fn run(ctx: &StageContext<'_>) -> Result<StageEvent, StageError> {
    let stats = ctx.playbook()?.stats();
    let answer = final_answer(ctx).unwrap_or_else(|| UNAVAILABLE.to_string());

    Ok(StageEvent::completed(
        CyclePhase::Done,
        Some(format!(
            "[Summary] Final answer: {}\nPlaybook: {}",
            answer, stats
        )),
        StateDelta::new(),
    ))
}

/// The generator's final answer from this cycle, if it produced one.
pub fn final_answer(ctx: &StageContext<'_>) -> Option<String> {
    let raw = ctx.session.get(keys::GENERATOR_OUTPUT)?.clone();
    decode_output::<GeneratorOutput>(CyclePhase::Produce, raw)
        .ok()
        .map(|output| output.final_answer)
}
