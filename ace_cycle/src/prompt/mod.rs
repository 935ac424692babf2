//! Prompt assembly for the inference stages.
//!
//! Prompts are an instruction followed by titled input sections. Wording is
//! deliberately minimal; the structured output schema carries the contract.

use serde_json::Value;

/// Placeholder for inputs that are absent from the session.
pub const UNAVAILABLE: &str = "(unavailable)";

/// Placeholder for a playbook without bullets.
pub const EMPTY_PLAYBOOK: &str = "(empty playbook)";

pub const GENERATOR_INSTRUCTION: &str = "\
Answer the user query. Apply relevant playbook bullets and avoid the failures they describe. \
Reason step by step, list the ids of every bullet you used, then give a concise, verified final answer.";

pub const REFLECTOR_INSTRUCTION: &str = "\
Critically analyze the generator output. Identify what went wrong, why, and what should have been done. \
State one key insight to remember. Tag each bullet the generator used as helpful, harmful or neutral.";

pub const CURATOR_INSTRUCTION: &str = "\
Curate the playbook using the reflection. Only add insights that are missing, improve or remove \
erroneous or duplicate bullets, and never regenerate the whole playbook. \
Use at most 3 operations; return an empty list if no changes are needed.";

/// A prompt under construction.
#[derive(Debug, Clone)]
pub struct Prompt {
    instruction: String,
    sections: Vec<(String, String)>,
}

impl Prompt {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            sections: Vec::new(),
        }
    }

    /// Append a titled input section. Blank bodies render as [`UNAVAILABLE`].
    pub fn with_section(mut self, title: impl Into<String>, body: impl Into<String>) -> Self {
        self.sections.push((title.into(), body.into()));
        self
    }

    /// Append a section only when a body is present.
    pub fn with_optional_section(self, title: impl Into<String>, body: Option<String>) -> Self {
        match body {
            Some(body) => self.with_section(title, body),
            None => self,
        }
    }

    pub fn render(&self) -> String {
        let mut prompt = self.instruction.clone();

        for (title, body) in &self.sections {
            let body = if body.trim().is_empty() {
                UNAVAILABLE
            } else {
                body.as_str()
            };
            prompt.push_str(&format!("\n\n## {}\n{}", title, body));
        }

        prompt
    }
}

/// Render a session value as prompt text.
///
/// Strings are used verbatim, null becomes [`UNAVAILABLE`], anything else is
/// pretty JSON.
pub fn value_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => UNAVAILABLE.to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_sections_in_order() {
        let prompt = Prompt::new("Do the thing.")
            .with_section("User Query", "2 + 2?")
            .with_section("Current Playbook", "")
            .with_optional_section("Ground Truth", None)
            .render();

        assert_eq!(
            prompt,
            "Do the thing.\n\n## User Query\n2 + 2?\n\n## Current Playbook\n(unavailable)"
        );
    }

    #[test]
    fn test_value_text() {
        assert_eq!(value_text(None), UNAVAILABLE);
        assert_eq!(value_text(Some(&Value::Null)), UNAVAILABLE);
        assert_eq!(value_text(Some(&json!("plain"))), "plain");
        assert!(value_text(Some(&json!({"final_answer": "4"}))).contains("\"final_answer\": \"4\""));
    }
}
