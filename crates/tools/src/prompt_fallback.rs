//! Prompt-Based Tool Calling Fallback
//!
//! For backends that don't return native tool calls, tool descriptions are
//! injected into the prompt and tool calls are parsed out of the response
//! text. Which textual convention to parse is chosen by the provider's
//! `TextActionFormat`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use phasewright_llm::types::{TextActionFormat, ToolDefinition};

/// A tool call parsed from the model's text response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedToolCall {
    /// The name of the tool to call
    pub tool_name: String,
    /// The arguments as a JSON object
    pub arguments: Value,
    /// The raw text block that was parsed
    pub raw_text: String,
}

const NAME_KEYS: &[&str] = &["tool", "tool_name"];
const ARG_KEYS: &[&str] = &["args", "arguments", "parameters", "input"];

// ============================================================================
// Instructions
// ============================================================================

/// Build the tool calling instructions to append to the system prompt.
///
/// Returns an empty string for `TextActionFormat::None` or an empty catalog.
pub fn build_tool_call_instructions(tools: &[ToolDefinition], format: TextActionFormat) -> String {
    if tools.is_empty() || format == TextActionFormat::None {
        return String::new();
    }

    let mut tool_descriptions = String::new();
    for tool in tools {
        tool_descriptions.push_str(&format!("### {}\n{}\n", tool.name, tool.description));

        if let Some(properties) = tool.input_schema.properties.as_ref() {
            if !properties.is_empty() {
                tool_descriptions.push_str("Parameters:\n");
                let required = tool.input_schema.required_names();
                let mut names: Vec<&String> = properties.keys().collect();
                names.sort();
                for name in names {
                    let schema = &properties[name];
                    let req_marker = if required.contains(name) {
                        "required"
                    } else {
                        "optional"
                    };
                    let mut line = format!("  - `{}` ({}, {})", name, schema.schema_type, req_marker);
                    if let Some(desc) = schema.description.as_deref() {
                        line.push_str(&format!(": {}", desc));
                    }
                    if let Some(values) = schema.enum_values.as_ref() {
                        line.push_str(&format!(" [one of: {}]", values.join(", ")));
                    }
                    tool_descriptions.push_str(&line);
                    tool_descriptions.push('\n');
                }
            }
        }
        tool_descriptions.push('\n');
    }

    let call_format = match format {
        TextActionFormat::ToolCallBlock => {
            "To use a tool, output a block in this exact format:\n\n\
             ```tool_call\n\
             {\"tool\": \"tool_name\", \"arguments\": {\"param\": \"value\"}}\n\
             ```\n\n\
             - The block must start with ```tool_call and end with ```\n\
             - The JSON must be valid"
        }
        _ => {
            "To use a tool, output a JSON object on its own line:\n\n\
             {\"tool\": \"tool_name\", \"args\": {\"param\": \"value\"}}\n\n\
             - Several calls may be given as a JSON array or one per line\n\
             - The JSON must be valid"
        }
    };

    format!(
        "## Tools\n\n{call_format}\n\
         - After making tool calls, stop and wait for the results\n\
         - Never invent tool results\n\
         - Only use tools from the list below\n\n\
         ## Available Tools\n\n{tool_descriptions}",
        call_format = call_format,
        tool_descriptions = tool_descriptions,
    )
    .trim_end()
    .to_string()
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse tool calls from a response text using the given convention.
///
/// Never fails: text that does not match the convention yields no calls.
pub fn parse_tool_calls(text: &str, format: TextActionFormat) -> Vec<ParsedToolCall> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    match format {
        TextActionFormat::None => Vec::new(),
        TextActionFormat::GenericJson => parse_generic_json(text),
        TextActionFormat::ToolCallBlock => parse_tool_call_blocks(text),
    }
}

/// Generic JSON convention.
///
/// - Pass 1: the whole text is a JSON array of calls
/// - Pass 2: the whole text is a single call object
/// - Pass 3: fenced code blocks holding an array or an object
/// - Pass 4: balanced `{...}` objects anywhere in the text, per line or inline
fn parse_generic_json(text: &str) -> Vec<ParsedToolCall> {
    let calls = parse_json_payload(text);
    if !calls.is_empty() {
        return calls;
    }

    let mut calls = Vec::new();
    for block in fenced_blocks(text) {
        calls.extend(parse_json_payload(block.trim()));
    }
    if !calls.is_empty() {
        return calls;
    }

    scan_balanced_objects(text)
}

/// Tool-call block convention.
///
/// - Pass 1: ```` ```tool_call ... ``` ```` blocks
/// - Pass 2: `<tool_call>...</tool_call>` tags
/// - Pass 3: bare JSON, as in the generic convention
fn parse_tool_call_blocks(text: &str) -> Vec<ParsedToolCall> {
    let mut calls = Vec::new();

    let mut remaining = text;
    while let Some(start) = remaining.find("```tool_call") {
        let after_marker = &remaining[start + "```tool_call".len()..];
        let Some(end) = after_marker.find("```") else {
            break;
        };
        let block = after_marker[..end].trim();
        for mut call in parse_json_payload(block) {
            call.raw_text = format!("```tool_call\n{}\n```", block);
            calls.push(call);
        }
        remaining = &after_marker[end + 3..];
    }
    if !calls.is_empty() {
        return calls;
    }

    let mut remaining = text;
    while let Some(start) = remaining.find("<tool_call>") {
        let after_tag = &remaining[start + "<tool_call>".len()..];
        let Some(end) = after_tag.find("</tool_call>") else {
            break;
        };
        let block = after_tag[..end].trim();
        for mut call in parse_json_payload(block) {
            call.raw_text = format!("<tool_call>{}</tool_call>", block);
            calls.push(call);
        }
        remaining = &after_tag[end + "</tool_call>".len()..];
    }
    if !calls.is_empty() {
        return calls;
    }

    parse_generic_json(text)
}

/// Parse a JSON array of calls or a single call object.
fn parse_json_payload(payload: &str) -> Vec<ParsedToolCall> {
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Array(items)) => items
            .iter()
            .filter_map(|item| call_from_value(item, &item.to_string()))
            .collect(),
        Ok(value @ Value::Object(_)) => call_from_value(&value, payload).into_iter().collect(),
        _ => Vec::new(),
    }
}

/// Interpret one JSON value as a tool call.
///
/// Accepts `tool` / `tool_name` as the name key, or `name` when an argument
/// key is also present. Arguments may be an object or a stringified object.
fn call_from_value(value: &Value, raw_text: &str) -> Option<ParsedToolCall> {
    let obj = value.as_object()?;

    let arg_value = ARG_KEYS.iter().find_map(|k| obj.get(*k));

    let name = NAME_KEYS
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .or_else(|| {
            arg_value?;
            obj.get("name").and_then(Value::as_str)
        })?
        .trim();
    if name.is_empty() {
        return None;
    }

    Some(ParsedToolCall {
        tool_name: name.to_string(),
        arguments: normalize_arguments(arg_value),
        raw_text: raw_text.to_string(),
    })
}

fn normalize_arguments(value: Option<&Value>) -> Value {
    match value {
        Some(Value::Object(map)) => Value::Object(map.clone()),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s.trim()) {
            Ok(obj @ Value::Object(_)) => obj,
            _ => Value::Object(Map::new()),
        },
        _ => Value::Object(Map::new()),
    }
}

/// Contents of every fenced code block (any language tag).
fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut remaining = text;
    while let Some(start) = remaining.find("```") {
        let after_fence = &remaining[start + 3..];
        // Skip the info string (e.g. `json`) up to the end of the line.
        let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(after_fence.len());
        let body = &after_fence[body_start..];
        let Some(end) = body.find("```") else {
            break;
        };
        blocks.push(&body[..end]);
        remaining = &body[end + 3..];
    }
    blocks
}

/// Find every balanced, string-aware `{...}` span that parses as a call.
fn scan_balanced_objects(text: &str) -> Vec<ParsedToolCall> {
    let mut calls = Vec::new();
    let mut pos = 0;
    while let Some(offset) = text[pos..].find('{') {
        let start = pos + offset;
        match balanced_object_end(text, start) {
            Some(end) => {
                let span = &text[start..end];
                if let Ok(value) = serde_json::from_str::<Value>(span) {
                    if let Some(call) = call_from_value(&value, span) {
                        calls.push(call);
                        pos = end;
                        continue;
                    }
                }
                pos = start + 1;
            }
            // Unclosed brace; later lines may still hold calls
            None => pos = start + 1,
        }
    }
    calls
}

/// Byte index just past the `}` closing the object that opens at `start`.
fn balanced_object_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Whether the object opening at `start` begins with a tool-name key.
fn starts_tool_call(text: &str, start: usize) -> bool {
    let rest = text[start + 1..].trim_start();
    NAME_KEYS
        .iter()
        .any(|k| rest.starts_with(&format!("\"{}\"", k)))
}

// ============================================================================
// Stripping
// ============================================================================

/// Remove literal tool-call objects embedded in a line of prose.
///
/// Removes balanced spans that parse as tool calls, plus any unterminated
/// object that starts with a tool-name key (it runs to the end of the
/// line). Other braces are left alone.
pub fn strip_inline_tool_calls(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut pos = 0;
    while let Some(offset) = line[pos..].find('{') {
        let start = pos + offset;
        match balanced_object_end(line, start) {
            Some(end) => {
                let span = &line[start..end];
                let is_call = serde_json::from_str::<Value>(span)
                    .ok()
                    .and_then(|v| call_from_value(&v, span))
                    .is_some()
                    || starts_tool_call(line, start);
                if is_call {
                    out.push_str(&line[pos..start]);
                } else {
                    out.push_str(&line[pos..end]);
                }
                pos = end;
            }
            None => {
                if starts_tool_call(line, start) {
                    out.push_str(&line[pos..start]);
                    pos = line.len();
                } else {
                    out.push_str(&line[pos..start + 1]);
                    pos = start + 1;
                }
            }
        }
    }
    out.push_str(&line[pos..]);
    out
}
