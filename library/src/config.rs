//! Evaluation settings.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::FieldError;

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct EvaluationConfig {
    /// Run structural validation on every built procedure before executing it.
    #[serde(default = "default_true")]
    pub validate_procedures: bool,
    /// Log the DOT graph of every built procedure at trace level.
    #[serde(default)]
    pub dump_procedures: bool,
    /// Element count at which elementwise functions switch to parallel evaluation.
    #[serde(default = "default_parallel_grain_size")]
    pub parallel_grain_size: usize,
}

fn default_true() -> bool {
    true
}

fn default_parallel_grain_size() -> usize {
    4096
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            validate_procedures: true,
            dump_procedures: false,
            parallel_grain_size: default_parallel_grain_size(),
        }
    }
}

impl EvaluationConfig {
    pub fn load(json_str: &str) -> Result<Self, serde_json::Error> {
        let config: EvaluationConfig = serde_json::from_str(json_str)?;

        Ok(config)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, FieldError> {
        let json_str = std::fs::read_to_string(path)?;
        Ok(Self::load(&json_str)?)
    }

    pub fn save(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
