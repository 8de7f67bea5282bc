//! Workflow Models
//!
//! A workflow file is a JSON description of a phase sequence. System
//! prompts are given inline or as prompt files next to the workflow;
//! validators are declarative and compiled into closures.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::phase::{Phase, PhaseResult};
use crate::utils::error::{EngineError, EngineResult};
use crate::utils::paths::resolve_relative;

/// A declarative phase validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidatorSpec {
    /// Output must contain the given text
    Contains { value: String },
    /// Structured data must be an object holding every key
    RequiredKeys { keys: Vec<String> },
    /// Output must not be blank
    NonEmpty,
}

impl ValidatorSpec {
    /// Check one result against this rule
    pub fn check(&self, result: &PhaseResult) -> Result<(), String> {
        match self {
            ValidatorSpec::Contains { value } => {
                if result.output.contains(value.as_str()) {
                    Ok(())
                } else {
                    Err(format!("output does not contain '{}'", value))
                }
            }
            ValidatorSpec::RequiredKeys { keys } => {
                let obj = result
                    .data
                    .as_ref()
                    .and_then(|d| d.as_object())
                    .ok_or_else(|| "no structured data in output".to_string())?;
                match keys.iter().find(|k| !obj.contains_key(k.as_str())) {
                    Some(missing) => Err(format!("missing required key '{}'", missing)),
                    None => Ok(()),
                }
            }
            ValidatorSpec::NonEmpty => {
                if result.output.trim().is_empty() {
                    Err("output is empty".to_string())
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// One phase in a workflow file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Path to a prompt file, relative to the workflow file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_file: Option<PathBuf>,
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    #[serde(default)]
    pub max_rounds: u32,
    #[serde(default)]
    pub expects_json: bool,
    #[serde(default)]
    pub validators: Vec<ValidatorSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logit_bias: Option<HashMap<u32, f32>>,
}

/// A phase sequence loaded from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub phases: Vec<PhaseDefinition>,
    /// Directory prompt files are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl WorkflowDefinition {
    /// Load and validate a workflow file
    pub fn load(path: &Path) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::config(format!("Failed to read workflow {}: {}", path.display(), e))
        })?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_json(&content, base_dir)
    }

    /// Parse and validate a workflow from a JSON string
    pub fn from_json(content: &str, base_dir: impl Into<PathBuf>) -> EngineResult<Self> {
        let mut workflow: WorkflowDefinition = serde_json::from_str(content)
            .map_err(|e| EngineError::config(format!("Invalid workflow JSON: {}", e)))?;
        workflow.base_dir = base_dir.into();
        workflow.validate()?;
        Ok(workflow)
    }

    /// Check names and prompt sources
    pub fn validate(&self) -> EngineResult<()> {
        if self.name.trim().is_empty() {
            return Err(EngineError::validation("workflow name cannot be empty"));
        }
        if self.phases.is_empty() {
            return Err(EngineError::validation(format!(
                "workflow {} has no phases",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for phase in &self.phases {
            if phase.name.trim().is_empty() {
                return Err(EngineError::validation("phase name cannot be empty"));
            }
            if !seen.insert(phase.name.as_str()) {
                return Err(EngineError::validation(format!(
                    "duplicate phase name: {}",
                    phase.name
                )));
            }
            if phase.system_prompt.is_some() && phase.prompt_file.is_some() {
                return Err(EngineError::validation(format!(
                    "phase {} sets both system_prompt and prompt_file",
                    phase.name
                )));
            }
            let wants_keys = phase
                .validators
                .iter()
                .any(|v| matches!(v, ValidatorSpec::RequiredKeys { .. }));
            if wants_keys && !phase.expects_json {
                return Err(EngineError::validation(format!(
                    "phase {} uses required_keys without expects_json",
                    phase.name
                )));
            }
        }
        Ok(())
    }

    /// Build runnable phases, reading prompt files
    pub fn into_phases(self) -> EngineResult<Vec<Phase>> {
        let base_dir = self.base_dir;
        self.phases
            .into_iter()
            .map(|def| def.into_phase(&base_dir))
            .collect()
    }
}

impl PhaseDefinition {
    fn into_phase(self, base_dir: &Path) -> EngineResult<Phase> {
        let system_prompt = match (&self.system_prompt, &self.prompt_file) {
            (Some(inline), _) => inline.clone(),
            (None, Some(file)) => {
                let path = resolve_relative(base_dir, file);
                std::fs::read_to_string(&path).map_err(|e| {
                    EngineError::config(format!(
                        "Failed to read prompt file {} for phase {}: {}",
                        path.display(),
                        self.name,
                        e
                    ))
                })?
            }
            (None, None) => String::new(),
        };

        let mut phase = Phase::new(self.name)
            .with_description(self.description)
            .with_system_prompt(system_prompt)
            .with_allowed_tools(self.allowed_tools)
            .with_max_rounds(self.max_rounds);
        if self.expects_json {
            phase = phase.expecting_json();
        }
        if let Some(bias) = self.logit_bias {
            phase = phase.with_logit_bias(bias);
        }
        if !self.validators.is_empty() {
            let rules = self.validators;
            phase = phase.with_validator(move |result| {
                rules.iter().try_for_each(|rule| rule.check(result))
            });
        }
        Ok(phase)
    }
}
