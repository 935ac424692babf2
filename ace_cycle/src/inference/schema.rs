//! JSON schemas for the structured results of each stage.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// The structured result a stage expects back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputSchema {
    /// Reasoning steps, referenced bullet ids and a final answer.
    Generator,
    /// Critique fields plus bullet tag assignments.
    Reflection,
    /// Curator reasoning and up to three operations.
    DeltaBatch,
}

impl OutputSchema {
    pub fn name(&self) -> &'static str {
        match self {
            OutputSchema::Generator => "generator_output",
            OutputSchema::Reflection => "reflection",
            OutputSchema::DeltaBatch => "delta_batch",
        }
    }

    /// JSON schema an engine can enforce.
    pub fn json_schema(&self) -> Value {
        match self {
            OutputSchema::Generator => json!({
                "type": "object",
                "properties": {
                    "reasoning": { "type": "array", "items": { "type": "string" } },
                    "bullet_ids": { "type": "array", "items": { "type": "string" } },
                    "final_answer": { "type": "string" }
                },
                "required": ["reasoning", "final_answer"]
            }),
            OutputSchema::Reflection => json!({
                "type": "object",
                "properties": {
                    "reasoning": { "type": "string" },
                    "error_identification": { "type": "string" },
                    "root_cause_analysis": { "type": "string" },
                    "correct_approach": { "type": "string" },
                    "key_insight": { "type": "string" },
                    "bullet_tags": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "id": { "type": "string" },
                                "tag": { "type": "string", "enum": ["helpful", "harmful", "neutral"] }
                            },
                            "required": ["id", "tag"]
                        }
                    }
                },
                "required": [
                    "reasoning",
                    "error_identification",
                    "root_cause_analysis",
                    "correct_approach",
                    "key_insight"
                ]
            }),
            OutputSchema::DeltaBatch => json!({
                "type": "object",
                "properties": {
                    "reasoning": { "type": "string" },
                    "operations": {
                        "type": "array",
                        "maxItems": playbook::MAX_OPERATIONS,
                        "items": {
                            "type": "object",
                            "properties": {
                                "type": { "type": "string", "enum": ["ADD", "UPDATE", "REMOVE"] },
                                "section": { "type": "string" },
                                "content": { "type": "string" },
                                "bullet_id": { "type": "string" }
                            },
                            "required": ["type"]
                        }
                    }
                },
                "required": ["reasoning", "operations"]
            }),
        }
    }
}
