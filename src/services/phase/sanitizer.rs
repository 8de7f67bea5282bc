//! Output Sanitizer
//!
//! Reduces a finished phase's raw output to what the next phase should see.
//! Planning phases collapse to a short digest pointing at the recall tool;
//! every other phase loses fenced code, path-like lines, and literal
//! tool-call JSON.

use serde_json::Value;

use phasewright_tools::strip_inline_tool_calls;

use crate::models::settings::SanitizerConfig;
use crate::services::phase::extraction::extract_json_object;

/// Decides whether a line of output names a file rather than describing work
pub type PathHeuristic = fn(&str) -> bool;

const PLAN_DIGEST_HEADER: &str = "A detailed implementation plan was created.";

const PATH_EXTENSIONS: &[&str] = &[
    ".go", ".js", ".py", ".ts", ".java", ".cpp", ".h", ".md", ".json", ".yaml", ".yml", ".rs",
    ".toml",
];

/// Default path policy.
///
/// A line is path-like when it is a single token containing `/` (under 200
/// chars), or when any of its tokens ends in a known source/doc extension.
pub fn default_path_heuristic(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }

    if trimmed.contains('/') && !trimmed.contains(char::is_whitespace) && trimmed.len() < 200 {
        return true;
    }

    trimmed.split_whitespace().any(|token| {
        let token = token.trim_matches(|c: char| {
            matches!(c, ',' | ';' | ':' | '(' | ')' | '`' | '"' | '\'' | '*' | '[' | ']')
        });
        let token = token.trim_end_matches('.');
        PATH_EXTENSIONS.iter().any(|ext| {
            token.len() > ext.len() && token.to_ascii_lowercase().ends_with(ext)
        })
    })
}

/// Phase-aware output sanitizer
#[derive(Debug, Clone)]
pub struct OutputSanitizer {
    config: SanitizerConfig,
    path_heuristic: PathHeuristic,
}

impl OutputSanitizer {
    pub fn new(config: SanitizerConfig) -> Self {
        Self {
            config,
            path_heuristic: default_path_heuristic,
        }
    }

    /// Swap the path policy
    pub fn with_path_heuristic(mut self, heuristic: PathHeuristic) -> Self {
        self.path_heuristic = heuristic;
        self
    }

    pub fn config(&self) -> &SanitizerConfig {
        &self.config
    }

    /// Sanitize `output` produced by `phase_name`
    pub fn sanitize(&self, phase_name: &str, output: &str) -> String {
        if output.trim().is_empty() {
            return String::new();
        }
        if self.config.is_planning_phase(phase_name) {
            self.plan_digest(output)
        } else {
            self.strip(output)
        }
    }

    /// Short description of a plan plus how to recall the full text
    pub fn plan_digest(&self, output: &str) -> String {
        if output.starts_with(PLAN_DIGEST_HEADER) {
            return output.to_string();
        }

        let mut digest = format!("{}\n\n", PLAN_DIGEST_HEADER);

        if let Some(data) = extract_json_object(output) {
            let plan = data
                .get("plan")
                .filter(|p| p.is_object())
                .unwrap_or(&data);
            if let Some(title) = plan.get("title").and_then(Value::as_str) {
                digest.push_str(&format!("Title: {}\n", title));
            }
            let total_steps = plan
                .get("total_steps")
                .and_then(Value::as_u64)
                .or_else(|| plan.get("steps").and_then(Value::as_array).map(|s| s.len() as u64));
            if let Some(total) = total_steps {
                digest.push_str(&format!("Total steps: {}\n", total));
            }
        }

        digest.push_str(&format!(
            "\nUse the `{}` tool with action `recall` and key `{}` to read the full plan.",
            self.config.recall_tool, self.config.recall_key
        ));
        digest
    }

    /// Drop fenced blocks, path-like lines, JSON lines, and inline tool calls
    pub fn strip(&self, output: &str) -> String {
        let mut kept: Vec<String> = Vec::new();
        let mut in_fence = false;

        for line in output.lines() {
            // Calls come off first so a fence they were hiding is still seen
            let mut line = line.to_string();
            if line.contains('{') {
                let stripped = strip_inline_tool_calls(&line);
                if stripped != line {
                    if stripped.trim().is_empty() {
                        continue;
                    }
                    line = stripped.trim_end().to_string();
                }
            }

            if line.trim().starts_with("```") {
                in_fence = !in_fence;
                continue;
            }
            if in_fence {
                continue;
            }

            if (self.path_heuristic)(&line) {
                continue;
            }

            let trimmed = line.trim();
            if trimmed.starts_with('{') && trimmed.contains(':') {
                continue;
            }

            kept.push(line);
        }

        kept.join("\n").trim().to_string()
    }
}

impl Default for OutputSanitizer {
    fn default() -> Self {
        Self::new(SanitizerConfig::default())
    }
}
