//! Cycle configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::cycle::CyclePhase;
use crate::session::keys;
use playbook::MAX_OPERATIONS;

const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Options for a cycle. Every field is optional in TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Model used by the generator stage.
    pub generator_model: String,

    /// Model used by the reflector stage.
    pub reflector_model: String,

    /// Model used by the curator stage.
    pub curator_model: String,

    /// Delta batch bound. Values above the protocol maximum are clamped.
    pub max_operations: usize,

    /// Whether to emit a summary event after curation.
    pub summarize: bool,

    /// Session key of the persisted playbook.
    pub playbook_key: String,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            generator_model: DEFAULT_MODEL.to_string(),
            reflector_model: DEFAULT_MODEL.to_string(),
            curator_model: DEFAULT_MODEL.to_string(),
            max_operations: MAX_OPERATIONS,
            summarize: false,
            playbook_key: keys::PLAYBOOK.to_string(),
        }
    }
}

impl CycleConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Model id for a stage, if that stage calls the inference engine.
    pub fn model_for(&self, phase: CyclePhase) -> Option<&str> {
        match phase {
            CyclePhase::Produce => Some(&self.generator_model),
            CyclePhase::Critique => Some(&self.reflector_model),
            CyclePhase::Curate => Some(&self.curator_model),
            CyclePhase::Init | CyclePhase::Done => None,
        }
    }

    /// Effective operation bound.
    pub fn operation_limit(&self) -> usize {
        self.max_operations.min(MAX_OPERATIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CycleConfig::default();
        assert_eq!(config.generator_model, "gemini-2.5-flash");
        assert_eq!(config.operation_limit(), 3);
        assert_eq!(config.playbook_key, "app:playbook");
        assert!(!config.summarize);
    }

    #[test]
    fn test_partial_toml() {
        let config = CycleConfig::from_toml_str(
            r#"
            curator_model = "gemini-2.5-pro"
            summarize = true
            "#,
        )
        .unwrap();

        assert_eq!(config.curator_model, "gemini-2.5-pro");
        assert_eq!(config.reflector_model, "gemini-2.5-flash");
        assert!(config.summarize);
        assert_eq!(config.model_for(CyclePhase::Curate), Some("gemini-2.5-pro"));
        assert_eq!(config.model_for(CyclePhase::Init), None);
    }

    #[test]
    fn test_operation_limit_is_clamped() {
        let config = CycleConfig::from_toml_str("max_operations = 10").unwrap();
        assert_eq!(config.operation_limit(), 3);

        let config = CycleConfig::from_toml_str("max_operations = 1").unwrap();
        assert_eq!(config.operation_limit(), 1);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            CycleConfig::from_toml_str("max_operations = \"many\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            CycleConfig::from_file("/nonexistent/ace.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}
