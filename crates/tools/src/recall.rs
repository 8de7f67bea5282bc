//! Recall Tool
//!
//! Read access to values the phase sequencer stored in the shared memory
//! store, e.g. the full structured plan whose digest was passed to the next
//! phase. Supports `recall` (exact key) and `list` (keys containing a
//! pattern).

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use phasewright_core::{CoreResult, ParameterSchema, ToolContext};

use crate::arguments::ToolArguments;
use crate::executor::ToolResult;
use crate::trait_def::Tool;

/// Default registered name.
pub const DEFAULT_RECALL_TOOL_NAME: &str = "context";

/// Tool that reads from the job's memory store.
pub struct RecallTool {
    name: String,
}

impl RecallTool {
    /// Create a recall tool registered as `context`.
    pub fn new() -> Self {
        Self::named(DEFAULT_RECALL_TOOL_NAME)
    }

    /// Create a recall tool under a custom name.
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for RecallTool {
    fn default() -> Self {
        Self::new()
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

#[async_trait]
impl Tool for RecallTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Retrieve content stored by earlier phases. Use action 'recall' with a key, \
         or 'list' to see which keys are available."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut properties = HashMap::new();
        properties.insert(
            "action".to_string(),
            ParameterSchema::string_enum(Some("Operation to perform"), &["recall", "list"]),
        );
        properties.insert(
            "key".to_string(),
            ParameterSchema::string(Some("Key to recall, or substring filter for list")),
        );
        ParameterSchema::object(None, properties, vec!["action".to_string()])
    }

    async fn execute(&self, ctx: &ToolContext, args: ToolArguments) -> CoreResult<ToolResult> {
        match args.str("action")? {
            "recall" => {
                let Some(key) = args.opt_str("key") else {
                    return Ok(ToolResult::err("missing 'key' parameter"));
                };
                match ctx.recall(key) {
                    Some(value) => Ok(ToolResult::ok(render(&value))),
                    None => Ok(ToolResult::err(format!("no entry found for key '{}'", key))),
                }
            }
            "list" => {
                let pattern = args.opt_str("key").unwrap_or("");
                let keys: Vec<String> = ctx
                    .search_memory(pattern)
                    .into_iter()
                    .map(|(k, _)| k)
                    .collect();
                if keys.is_empty() {
                    Ok(ToolResult::ok("No stored entries."))
                } else {
                    Ok(ToolResult::ok(keys.join("\n")))
                }
            }
            other => Ok(ToolResult::err(format!("unknown action: {}", other))),
        }
    }
}
