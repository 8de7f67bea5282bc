//! Tool Trait and Registry
//!
//! - `Tool` - the interface every invocable tool implements
//! - `ToolRegistry` - ordered registry with per-phase catalogs and
//!   schema-validated dispatch
//! - `FunctionTool` - closure-based tool, mostly for tests and small glue

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use phasewright_core::{CoreError, CoreResult, ParameterSchema, ToolContext};
use phasewright_llm::ToolDefinition;

use crate::arguments::ToolArguments;
use crate::executor::ToolResult;

// ============================================================================
// Tool
// ============================================================================

/// A capability the model can invoke by name.
///
/// `execute` returns `Err` only for infrastructure failures. A tool that ran
/// and failed reports it through `ToolResult::err`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name.
    fn name(&self) -> &str;

    /// Human-readable description shown to the model.
    fn description(&self) -> &str;

    /// JSON schema for the tool's input parameters.
    fn parameters_schema(&self) -> ParameterSchema;

    /// Whether this tool typically runs for a long time.
    fn is_long_running(&self) -> bool {
        false
    }

    /// Execute the tool with already-validated arguments.
    async fn execute(&self, ctx: &ToolContext, args: ToolArguments) -> CoreResult<ToolResult>;

    /// Definition handed to the model.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.parameters_schema(),
        }
    }
}

// ============================================================================
// ToolRegistry
// ============================================================================

/// Registry of tools with O(1) lookup and insertion-ordered iteration.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    /// Insertion order for deterministic catalogs.
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if !self.tools.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.tools.insert(name, tool);
    }

    /// Unregister a tool by name. Returns the removed tool, or None.
    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn Tool>> {
        self.order.retain(|n| n != name);
        self.tools.remove(name)
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Check if a tool is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions for every registered tool, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.definition())
            .collect()
    }

    /// Definitions restricted to `allowed`, in registration order.
    ///
    /// An empty `allowed` list means no restriction. Names in `allowed`
    /// that are not registered are ignored.
    pub fn definitions_for(&self, allowed: &[String]) -> Vec<ToolDefinition> {
        if allowed.is_empty() {
            return self.definitions();
        }
        self.order
            .iter()
            .filter(|name| allowed.iter().any(|a| a == *name))
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.definition())
            .collect()
    }

    /// Names of long-running tools.
    pub fn long_running_tools(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|name| {
                self.tools
                    .get(*name)
                    .map(|t| t.is_long_running())
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    /// Execute a tool by name.
    ///
    /// Returns `Err(CoreError::NotFound)` if the tool is not registered and
    /// `Err(CoreError::Validation)` if the arguments do not match its schema.
    pub async fn execute(&self, name: &str, ctx: &ToolContext, args: Value) -> CoreResult<ToolResult> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| CoreError::not_found(format!("Tool not found: {}", name)))?;

        let args = ToolArguments::from_value(args)?;
        args.validate(&tool.parameters_schema())?;

        tracing::debug!(
            "[ToolRegistry] Executing {} (call {}, round {})",
            name,
            ctx.tool_call_id(),
            ctx.round()
        );
        tool.execute(ctx, args).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// FunctionTool
// ============================================================================

type BoxedHandler = dyn Fn(ToolContext, ToolArguments) -> Pin<Box<dyn Future<Output = CoreResult<ToolResult>> + Send>>
    + Send
    + Sync;

/// A tool backed by an async closure.
pub struct FunctionTool {
    name: String,
    description: String,
    schema: ParameterSchema,
    handler: Arc<BoxedHandler>,
}

impl FunctionTool {
    /// Create a tool from an async closure.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: ParameterSchema,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolContext, ToolArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CoreResult<ToolResult>> + Send + 'static,
    {
        let handler: Arc<BoxedHandler> = Arc::new(
            move |ctx: ToolContext, args: ToolArguments| -> Pin<Box<dyn Future<Output = CoreResult<ToolResult>> + Send>> {
                Box::pin(handler(ctx, args))
            },
        );
        Self {
            name: name.into(),
            description: description.into(),
            schema,
            handler,
        }
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> ParameterSchema {
        self.schema.clone()
    }

    async fn execute(&self, ctx: &ToolContext, args: ToolArguments) -> CoreResult<ToolResult> {
        (self.handler)(ctx.clone(), args).await
    }
}

// ============================================================================
// Tests
// ============================================================================
