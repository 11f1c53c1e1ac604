//! Executor configuration.

use crate::error::AccelResult;
use serde::{Deserialize, Serialize};

/// Configuration for a [`ModelExecutor`](crate::executor::ModelExecutor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Label prefixed to log lines. Default: "model"
    #[serde(default = "default_label")]
    pub label: String,

    /// Require output slices in `predict_into` to match the registered size
    /// exactly. When false, longer slices are accepted and only the leading
    /// registered elements are written. Default: true
    #[serde(default = "default_validate_outputs")]
    pub validate_outputs: bool,
}

fn default_label() -> String {
    "model".to_string()
}

fn default_validate_outputs() -> bool {
    true
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            label: default_label(),
            validate_outputs: default_validate_outputs(),
        }
    }
}

impl ExecutorConfig {
    /// Create a config with the given label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> AccelResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the log label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Enable or disable output length checks.
    pub fn with_validate_outputs(mut self, enabled: bool) -> Self {
        self.validate_outputs = enabled;
        self
    }
}
