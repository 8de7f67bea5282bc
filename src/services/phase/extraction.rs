//! Action Extraction
//!
//! Turns a model response into the ordered list of tool invocations it
//! requests. Native tool calls win; response text is parsed only when there
//! are none.

use serde_json::Value;

use phasewright_llm::{InferenceResponse, TextActionFormat};
use phasewright_tools::parse_tool_calls;

/// A tool invocation requested by the model for the current round
#[derive(Debug, Clone, PartialEq)]
pub struct RequestedAction {
    /// Native call id, or a generated one for text-parsed calls
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl RequestedAction {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: generate_call_id(),
            name: name.into(),
            arguments,
        }
    }
}

fn generate_call_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}

/// Extract requested actions from a response.
///
/// Parse failures yield no actions rather than an error.
pub fn extract_actions(response: &InferenceResponse, format: TextActionFormat) -> Vec<RequestedAction> {
    if response.has_tool_calls() {
        return response
            .tool_calls
            .iter()
            .map(|call| RequestedAction {
                id: if call.id.is_empty() {
                    generate_call_id()
                } else {
                    call.id.clone()
                },
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            })
            .collect();
    }

    if response.text.trim().is_empty() {
        return Vec::new();
    }

    let parsed = parse_tool_calls(&response.text, format);
    if !parsed.is_empty() {
        tracing::debug!(
            "[ActionExtraction] Parsed {} tool call(s) from response text ({})",
            parsed.len(),
            format
        );
    }
    parsed
        .into_iter()
        .map(|call| RequestedAction::new(call.tool_name, call.arguments))
        .collect()
}

/// Best-effort parse of the span from the first `{` to the last `}`.
///
/// Returns `None` unless that span is a JSON object.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}
