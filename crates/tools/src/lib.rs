//! Phasewright Tools
//!
//! The tool invocation contract consumed by the phase engine:
//! - `ToolResult` - execution result type
//! - `ToolArguments` - schema-validated arguments crossing the tool boundary
//! - `Tool` trait - unified tool interface
//! - `ToolRegistry` - registration, per-phase catalogs, and dispatch
//! - `FunctionTool` - closure-based tool creation
//! - `RecallTool` - read access to values the sequencer stashed in memory
//! - `ParsedToolCall` - textual tool-call parsing for backends without
//!   reliable native tool calling
//!
//! Concrete tools (file I/O, git, shell, test runners) live outside this
//! workspace and implement `Tool`.

pub mod arguments;
pub mod executor;
pub mod prompt_fallback;
pub mod recall;
pub mod trait_def;

// Re-export core types
pub use arguments::ToolArguments;
pub use executor::{truncate_output, ToolResult};
pub use prompt_fallback::{
    build_tool_call_instructions, parse_tool_calls, strip_inline_tool_calls, ParsedToolCall,
};
pub use recall::{RecallTool, DEFAULT_RECALL_TOOL_NAME};
pub use trait_def::{FunctionTool, Tool, ToolRegistry};
