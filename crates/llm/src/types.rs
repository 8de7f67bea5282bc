//! LLM Types
//!
//! Core types for model invocations.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use phasewright_core::ParameterSchema;

/// Textual tool-call convention a backend falls back to when it does not
/// return native structured tool calls.
///
/// Selected per provider through `LlmProvider::text_action_format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextActionFormat {
    /// Do not parse tool calls out of response text.
    None,
    /// `{"tool": "name", "args": {...}}` objects, as an array, a single
    /// object, inside fenced code blocks, or one per line.
    GenericJson,
    /// ```` ```tool_call ```` fenced blocks and `<tool_call>` tags.
    ToolCallBlock,
}

impl Default for TextActionFormat {
    fn default() -> Self {
        Self::GenericJson
    }
}

impl std::fmt::Display for TextActionFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextActionFormat::None => write!(f, "none"),
            TextActionFormat::GenericJson => write!(f, "generic_json"),
            TextActionFormat::ToolCallBlock => write!(f, "tool_call_block"),
        }
    }
}

/// Definition of a tool that can be called by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique name of the tool
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// JSON schema for the tool's input parameters
    pub input_schema: ParameterSchema,
}

/// A tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique ID for this tool call (may be empty for scripted responses)
    #[serde(default)]
    pub id: String,
    /// Name of the tool to call
    pub name: String,
    /// Arguments to pass to the tool
    #[serde(default = "empty_arguments")]
    pub arguments: serde_json::Value,
}

fn empty_arguments() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl ToolCall {
    /// Create a tool call with an empty id
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            arguments,
        }
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    /// Number of input/prompt tokens
    #[serde(default)]
    pub input_tokens: u32,
    /// Number of output/completion tokens
    #[serde(default)]
    pub output_tokens: u32,
}

impl UsageStats {
    /// Total tokens used
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    /// Accumulate another usage record into this one
    pub fn add(&mut self, other: &UsageStats) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// One model invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceRequest {
    /// System prompt for this call
    pub system_prompt: String,
    /// User prompt for this call
    pub user_prompt: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Tool catalog offered to the model (empty = tool calling disabled)
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
    /// Optional token-id → bias map
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logit_bias: Option<HashMap<u32, f32>>,
}

impl InferenceRequest {
    /// Create a request without tools or logit bias
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            temperature: 0.2,
            max_tokens: 4096,
            tools: Vec::new(),
            logit_bias: None,
        }
    }
}

/// Response from a model invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InferenceResponse {
    /// Text content of the response
    #[serde(default)]
    pub text: String,
    /// Native tool calls requested by the model
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    /// Token usage statistics
    #[serde(default)]
    pub usage: UsageStats,
}

impl InferenceResponse {
    /// A text-only response
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Attach a native tool call
    pub fn with_tool_call(mut self, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        self.tool_calls.push(ToolCall::new(name, arguments));
        self
    }

    /// Set token usage
    pub fn with_usage(mut self, input_tokens: u32, output_tokens: u32) -> Self {
        self.usage = UsageStats {
            input_tokens,
            output_tokens,
        };
        self
    }

    /// Check if the response has native tool calls
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Error types for model invocations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LlmError {
    /// Authentication failed (invalid API key)
    AuthenticationFailed { message: String },
    /// Rate limit exceeded
    RateLimited {
        message: String,
        retry_after: Option<u32>,
    },
    /// Invalid request (bad parameters)
    InvalidRequest { message: String },
    /// Server error from the provider
    ServerError {
        message: String,
        status: Option<u16>,
    },
    /// Network/connection error
    NetworkError { message: String },
    /// Response parsing error
    ParseError { message: String },
    /// Context length exceeded
    ContextLengthExceeded {
        message: String,
        max_tokens: Option<u32>,
    },
    /// Other error
    Other { message: String },
}

impl LlmError {
    /// Create a catch-all error
    pub fn other(message: impl Into<String>) -> Self {
        LlmError::Other {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmError::AuthenticationFailed { message } => {
                write!(f, "Authentication failed: {}", message)
            }
            LlmError::RateLimited { message, .. } => {
                write!(f, "Rate limited: {}", message)
            }
            LlmError::InvalidRequest { message } => {
                write!(f, "Invalid request: {}", message)
            }
            LlmError::ServerError { message, status } => {
                if let Some(s) = status {
                    write!(f, "Server error ({}): {}", s, message)
                } else {
                    write!(f, "Server error: {}", message)
                }
            }
            LlmError::NetworkError { message } => {
                write!(f, "Network error: {}", message)
            }
            LlmError::ParseError { message } => {
                write!(f, "Parse error: {}", message)
            }
            LlmError::ContextLengthExceeded { message, .. } => {
                write!(f, "Context length exceeded: {}", message)
            }
            LlmError::Other { message } => {
                write!(f, "Error: {}", message)
            }
        }
    }
}

impl std::error::Error for LlmError {}

/// Result type for model invocations
pub type LlmResult<T> = Result<T, LlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_action_format_default_is_generic_json() {
        assert_eq!(TextActionFormat::default(), TextActionFormat::GenericJson);
        assert_eq!(TextActionFormat::ToolCallBlock.to_string(), "tool_call_block");
    }

    #[test]
    fn test_response_deserializes_with_defaults() {
        let response: InferenceResponse =
            serde_json::from_str(r#"{"tool_calls": [{"name": "search"}]}"#).unwrap();
        assert_eq!(response.text, "");
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].id, "");
        assert!(response.tool_calls[0].arguments.is_object());
        assert_eq!(response.usage.total_tokens(), 0);
    }

    #[test]
    fn test_response_builders() {
        let response = InferenceResponse::text("working on it")
            .with_tool_call("edit", serde_json::json!({"file": "a.rs"}))
            .with_usage(120, 30);
        assert!(response.has_tool_calls());
        assert_eq!(response.usage.total_tokens(), 150);
    }

    #[test]
    fn test_usage_add() {
        let mut total = UsageStats::default();
        total.add(&UsageStats {
            input_tokens: 10,
            output_tokens: 5,
        });
        total.add(&UsageStats {
            input_tokens: 1,
            output_tokens: 1,
        });
        assert_eq!(total.total_tokens(), 17);
    }

    #[test]
    fn test_request_serialization_skips_missing_bias() {
        let request = InferenceRequest::new("sys", "user");
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("logit_bias").is_none());
        assert_eq!(json["max_tokens"], 4096);
    }

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::ServerError {
            message: "overloaded".to_string(),
            status: Some(529),
        };
        assert_eq!(err.to_string(), "Server error (529): overloaded");
        assert_eq!(LlmError::other("boom").to_string(), "Error: boom");
    }

    #[test]
    fn test_llm_error_serialization_is_tagged() {
        let err = LlmError::NetworkError {
            message: "connection reset".to_string(),
        };
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"type\":\"network_error\""));
    }
}
