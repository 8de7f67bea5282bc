//! Settings Models
//!
//! Engine configuration stored in config.json. Every prompt the engine
//! itself writes to the model lives here rather than in code.

use serde::{Deserialize, Serialize};

/// Engine configuration stored in config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Round budget for phases that don't set their own
    pub default_max_rounds: u32,
    /// Sampling temperature for every model call
    pub temperature: f32,
    /// Generation limit for every model call
    pub max_tokens: u32,
    /// Offer the tool catalog to the model
    pub enable_tools: bool,
    /// System prompt for phases without one
    pub default_system_prompt: Option<String>,
    /// Per-tool output limit in the feedback prompt
    pub feedback_truncate_chars: usize,
    /// Case-insensitive phrases that mark a round's text as complete
    pub completion_phrases: Vec<String>,
    /// Case-insensitive phrases that mark a successful tool output as complete
    pub completion_markers: Vec<String>,
    pub prompts: PromptConfig,
    pub sanitizer: SanitizerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_max_rounds: 20,
            temperature: 0.2,
            max_tokens: 4096,
            enable_tools: true,
            default_system_prompt: None,
            feedback_truncate_chars: 1000,
            completion_phrases: [
                "phase_complete",
                "phase complete",
                "task_complete",
                "task complete",
                "all done",
                "finished",
                "i'm done",
                "work is complete",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            completion_markers: vec!["pr created".to_string(), "pull request created".to_string()],
            prompts: PromptConfig::default(),
            sanitizer: SanitizerConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.default_max_rounds == 0 {
            return Err("default_max_rounds must be at least 1".to_string());
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "Invalid temperature: {}. Must be between 0.0 and 2.0",
                self.temperature
            ));
        }

        if self.max_tokens == 0 {
            return Err("max_tokens must be at least 1".to_string());
        }

        if self.feedback_truncate_chars == 0 {
            return Err("feedback_truncate_chars must be at least 1".to_string());
        }

        if self.completion_phrases.iter().all(|p| p.trim().is_empty()) {
            return Err("completion_phrases cannot be empty".to_string());
        }

        self.prompts.validate()?;
        self.sanitizer.validate()?;

        Ok(())
    }
}

/// Engine-authored prompt text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Sent when a round produced no tool calls and no completion signal
    pub nudge: String,
    /// First line of the tool feedback prompt
    pub feedback_header: String,
    /// Last line of the tool feedback prompt
    pub feedback_footer: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            nudge: "Please continue with the current phase. Use tools if needed, or indicate completion with PHASE_COMPLETE or TASK_COMPLETE.".to_string(),
            feedback_header: "Tool results:".to_string(),
            feedback_footer: "Continue with the phase. When complete, indicate with PHASE_COMPLETE.".to_string(),
        }
    }
}

impl PromptConfig {
    fn validate(&self) -> Result<(), String> {
        if self.nudge.trim().is_empty() {
            return Err("prompts.nudge cannot be empty".to_string());
        }
        if self.feedback_header.trim().is_empty() {
            return Err("prompts.feedback_header cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Output sanitizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizerConfig {
    /// Phases whose output is replaced by a digest
    pub planning_phases: Vec<String>,
    /// Tool the digest tells the model to use to read the full plan
    pub recall_tool: String,
    /// Memory key the full planning output is stored under
    pub recall_key: String,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            planning_phases: vec!["plan".to_string()],
            recall_tool: "context".to_string(),
            recall_key: "implementation_plan".to_string(),
        }
    }
}

impl SanitizerConfig {
    fn validate(&self) -> Result<(), String> {
        if self.recall_tool.trim().is_empty() {
            return Err("sanitizer.recall_tool cannot be empty".to_string());
        }
        if self.recall_key.trim().is_empty() {
            return Err("sanitizer.recall_key cannot be empty".to_string());
        }
        Ok(())
    }

    /// Whether `phase` produces a plan
    pub fn is_planning_phase(&self, phase: &str) -> bool {
        self.planning_phases.iter().any(|p| p == phase)
    }
}
