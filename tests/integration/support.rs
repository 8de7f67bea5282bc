//! Shared fixtures for the integration suite

use std::collections::HashMap;
use std::sync::Arc;

use phasewright::{EngineConfig, FunctionTool, PhaseContext, PhaseSequencer, ScriptedProvider, ToolRegistry, ToolResult};
use phasewright::models::phase::Phase;
use phasewright_core::ParameterSchema;

/// Registry with `read`, `write`, `search`, `edit` and `open_pr` tools
pub fn registry() -> Arc<ToolRegistry> {
    let mut path_props = HashMap::new();
    path_props.insert("path".to_string(), ParameterSchema::string(Some("File path")));

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(FunctionTool::new(
        "read",
        "Read a file",
        ParameterSchema::object(Some("args"), path_props.clone(), vec!["path".to_string()]),
        |_ctx, args| async move { Ok(ToolResult::ok(format!("contents of {}", args.str("path")?))) },
    )));
    registry.register(Arc::new(FunctionTool::new(
        "write",
        "Write a file",
        ParameterSchema::object(Some("args"), path_props.clone(), vec!["path".to_string()]),
        |_ctx, args| async move {
            let path = args.str("path")?.to_string();
            Ok(ToolResult::ok(format!("wrote {}", path)).with_modified(path))
        },
    )));
    registry.register(Arc::new(FunctionTool::new(
        "edit",
        "Edit a file in place",
        ParameterSchema::object(Some("args"), path_props, vec!["path".to_string()]),
        |_ctx, args| async move {
            let path = args.str("path")?.to_string();
            Ok(ToolResult::ok(format!("edited {}", path)).with_modified(path))
        },
    )));

    let mut search_props = HashMap::new();
    search_props.insert("pattern".to_string(), ParameterSchema::string(Some("Text to look for")));
    registry.register(Arc::new(FunctionTool::new(
        "search",
        "Search the workspace",
        ParameterSchema::object(Some("args"), search_props, vec!["pattern".to_string()]),
        |_ctx, args| async move { Ok(ToolResult::ok(format!("2 matches for {}", args.str("pattern")?))) },
    )));
    registry.register(Arc::new(FunctionTool::new(
        "open_pr",
        "Open a pull request",
        ParameterSchema::object(None, HashMap::new(), Vec::new()),
        |_ctx, _args| async move { Ok(ToolResult::ok("Pull request created: #42")) },
    )));
    Arc::new(registry)
}

pub fn sequencer(phases: Vec<Phase>, provider: Arc<ScriptedProvider>) -> PhaseSequencer {
    PhaseSequencer::new(
        phases,
        provider,
        registry(),
        EngineConfig::default(),
        PhaseContext::new("job-it", "."),
    )
}
