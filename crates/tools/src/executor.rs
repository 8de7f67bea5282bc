//! Tool Executor Core Types
//!
//! The result type every tool invocation produces. The round loop turns
//! these into per-phase summaries and into the feedback prompt for the
//! next round.

use serde::{Deserialize, Serialize};

/// Result of a tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the execution was successful
    pub success: bool,
    /// Output from the tool
    #[serde(default)]
    pub output: String,
    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Identifiers of resources (usually file paths) the tool modified
    #[serde(default)]
    pub modified_resources: Vec<String>,
}

impl ToolResult {
    /// Create a successful result
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
            modified_resources: Vec::new(),
        }
    }

    /// Create an error result
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
            modified_resources: Vec::new(),
        }
    }

    /// Record a modified resource
    pub fn with_modified(mut self, resource: impl Into<String>) -> Self {
        self.modified_resources.push(resource.into());
        self
    }

    /// Error text, or empty when the call succeeded
    pub fn error_text(&self) -> &str {
        self.error.as_deref().unwrap_or("")
    }

    /// Convert to string for model consumption
    pub fn to_content(&self) -> String {
        if self.success {
            self.output.clone()
        } else {
            format!(
                "Error: {}",
                self.error.as_deref().unwrap_or("Unknown error")
            )
        }
    }
}

/// Truncate `text` to at most `max_chars` characters, appending `...` when
/// anything was cut. Never splits a UTF-8 character.
pub fn truncate_output(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}
