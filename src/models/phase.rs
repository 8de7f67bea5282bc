//! Phase Models
//!
//! A `Phase` is one named unit of work in a sequence; a `PhaseResult` is
//! what the round loop produced for it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use phasewright_tools::ToolResult;

/// Checks a finished phase's result; `Err` carries the reason.
pub type PhaseValidator = Arc<dyn Fn(&PhaseResult) -> Result<(), String> + Send + Sync>;

/// Decision returned by a per-phase callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseControl {
    Continue,
    Stop,
}

/// Called after each successful phase; may halt the sequence.
pub type PhaseCallback = Arc<dyn Fn(&Phase, &PhaseResult) -> Result<PhaseControl, String> + Send + Sync>;

/// One phase of a sequence
#[derive(Clone, Default)]
pub struct Phase {
    /// Unique name within the sequence
    pub name: String,
    pub description: String,
    /// Empty means the caller's default system prompt is used
    pub system_prompt: String,
    /// Tools the phase may call; empty means unrestricted
    pub allowed_tools: Vec<String>,
    /// Round budget; 0 means the sequence default
    pub max_rounds: u32,
    /// Parse a structured object out of the final output
    pub expects_json: bool,
    pub validator: Option<PhaseValidator>,
    /// Applied only on rounds whose prompt is tool feedback
    pub logit_bias: Option<HashMap<u32, f32>>,
}

impl Phase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_allowed_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_rounds(mut self, rounds: u32) -> Self {
        self.max_rounds = rounds;
        self
    }

    pub fn expecting_json(mut self) -> Self {
        self.expects_json = true;
        self
    }

    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&PhaseResult) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn with_logit_bias(mut self, bias: HashMap<u32, f32>) -> Self {
        self.logit_bias = Some(bias);
        self
    }

    /// Round budget after applying the sequence default
    pub fn effective_budget(&self, default_max_rounds: u32) -> u32 {
        if self.max_rounds > 0 {
            self.max_rounds
        } else {
            default_max_rounds
        }
    }

    /// Whether the phase may call `tool`
    pub fn allows_tool(&self, tool: &str) -> bool {
        self.allowed_tools.is_empty() || self.allowed_tools.iter().any(|t| t == tool)
    }
}

impl std::fmt::Debug for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Phase")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("allowed_tools", &self.allowed_tools)
            .field("max_rounds", &self.max_rounds)
            .field("expects_json", &self.expects_json)
            .field("has_validator", &self.validator.is_some())
            .finish()
    }
}

/// Record of one executed tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallSummary {
    pub tool_name: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modified_files: Vec<String>,
}

impl ToolCallSummary {
    pub fn from_result(tool_name: impl Into<String>, result: &ToolResult) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: result.success,
            output: result.output.clone(),
            error: result.error.clone(),
            modified_files: result.modified_resources.clone(),
        }
    }
}

/// Result of executing one phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseResult {
    pub phase_name: String,
    pub success: bool,
    pub output: String,
    /// Structured object parsed from the output (expects-JSON phases)
    pub data: Option<Value>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub rounds_used: u32,
    /// In execution order
    pub tool_calls: Vec<ToolCallSummary>,
    /// Deduplicated, in first-seen order
    pub modified_files: Vec<String>,
}

impl PhaseResult {
    /// A fresh, not yet successful result starting now
    pub fn started(phase_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            phase_name: phase_name.into(),
            success: false,
            output: String::new(),
            data: None,
            error: None,
            started_at: now,
            completed_at: now,
            rounds_used: 0,
            tool_calls: Vec::new(),
            modified_files: Vec::new(),
        }
    }

    /// Append a tool call and merge its modified files
    pub fn record_tool_call(&mut self, summary: ToolCallSummary) {
        for file in &summary.modified_files {
            if !self.modified_files.contains(file) {
                self.modified_files.push(file.clone());
            }
        }
        self.tool_calls.push(summary);
    }

    /// Mark success with the final output
    pub fn succeed(&mut self, output: impl Into<String>, rounds_used: u32) {
        self.success = true;
        self.output = output.into();
        self.error = None;
        self.rounds_used = rounds_used;
        self.completed_at = Utc::now();
    }

    /// Mark failure with an error message
    pub fn fail(&mut self, error: impl Into<String>, rounds_used: u32) {
        self.success = false;
        self.error = Some(error.into());
        self.rounds_used = rounds_used;
        self.completed_at = Utc::now();
    }
}
