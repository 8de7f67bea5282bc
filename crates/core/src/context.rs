//! Context Hierarchy
//!
//! Defines the context hierarchy handed to tools and phase executors:
//!
//! 1. `ExecutionContext` trait - Base immutable context shared across all scopes
//! 2. `ToolContext` - Concrete struct for a single tool invocation
//! 3. `PhaseContext` - Concrete struct owned by the phase sequencer
//!
//! Tools only see `ToolContext` (read-only memory access). The sequencer owns
//! the `PhaseContext` and is the only writer of the shared memory store, which
//! backs the side-channel recall of large phase outputs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::error::{CoreError, CoreResult};

/// Shared key/value memory written by the sequencer and read by tools.
pub type MemoryStore = Arc<RwLock<HashMap<String, Value>>>;

// ============================================================================
// ExecutionContext Trait
// ============================================================================

/// Base execution context trait providing immutable job information.
pub trait ExecutionContext: Send + Sync {
    /// Returns the identifier of the job this execution belongs to.
    fn job_id(&self) -> &str;

    /// Returns the working directory tools should operate in.
    fn work_dir(&self) -> &Path;

    /// Returns the name of the currently executing phase.
    fn phase_name(&self) -> &str;

    /// Returns an optional execution tag for categorization (e.g., "build", "review").
    fn execution_tag(&self) -> Option<&str> {
        None
    }
}

// ============================================================================
// ToolContext
// ============================================================================

/// Context for a single tool invocation.
///
/// Tools receive a `ToolContext` and cannot mutate job state. The memory
/// store is shared with the owning `PhaseContext` but exposed read-only.
#[derive(Clone)]
pub struct ToolContext {
    job_id: String,
    work_dir: PathBuf,
    phase_name: String,
    execution_tag: Option<String>,
    /// Unique identifier for this specific tool call.
    tool_call_id: String,
    /// Round (1-based) in which the tool was requested.
    round: u32,
    memory_store: MemoryStore,
}

impl ToolContext {
    /// Create a new ToolContext with an empty memory store.
    pub fn new(
        job_id: impl Into<String>,
        work_dir: impl Into<PathBuf>,
        phase_name: impl Into<String>,
        tool_call_id: impl Into<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            work_dir: work_dir.into(),
            phase_name: phase_name.into(),
            execution_tag: None,
            tool_call_id: tool_call_id.into(),
            round: 1,
            memory_store: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Set the execution tag.
    pub fn with_execution_tag(mut self, tag: impl Into<String>) -> Self {
        self.execution_tag = Some(tag.into());
        self
    }

    /// Set the round number.
    pub fn with_round(mut self, round: u32) -> Self {
        self.round = round;
        self
    }

    /// Set the memory store (shared with the phase context).
    pub fn with_memory_store(mut self, store: MemoryStore) -> Self {
        self.memory_store = store;
        self
    }

    /// Returns the unique tool call identifier.
    pub fn tool_call_id(&self) -> &str {
        &self.tool_call_id
    }

    /// Returns the round in which this tool call was requested.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Look up a single memory entry by exact key.
    pub fn recall(&self, key: &str) -> Option<Value> {
        let store = self.memory_store.read().unwrap_or_else(|e| e.into_inner());
        store.get(key).cloned()
    }

    /// Search the memory store for entries whose key contains `key_pattern`.
    pub fn search_memory(&self, key_pattern: &str) -> Vec<(String, Value)> {
        let store = self.memory_store.read().unwrap_or_else(|e| e.into_inner());
        let mut hits: Vec<(String, Value)> = store
            .iter()
            .filter(|(k, _)| k.contains(key_pattern))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        hits.sort_by(|a, b| a.0.cmp(&b.0));
        hits
    }
}

impl ExecutionContext for ToolContext {
    fn job_id(&self) -> &str {
        &self.job_id
    }

    fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn phase_name(&self) -> &str {
        &self.phase_name
    }

    fn execution_tag(&self) -> Option<&str> {
        self.execution_tag.as_deref()
    }
}

// ============================================================================
// PhaseContext
// ============================================================================

/// Context owned by the phase sequencer for one job.
///
/// Creates `ToolContext`s for individual tool calls and is the only writer of
/// the shared memory store.
#[derive(Clone)]
pub struct PhaseContext {
    job_id: String,
    work_dir: PathBuf,
    phase_name: String,
    execution_tag: Option<String>,
    memory_store: MemoryStore,
}

impl PhaseContext {
    /// Create a new PhaseContext. The phase name starts empty until
    /// `enter_phase` is called.
    pub fn new(job_id: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            job_id: job_id.into(),
            work_dir: work_dir.into(),
            phase_name: String::new(),
            execution_tag: None,
            memory_store: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Set the execution tag.
    pub fn with_execution_tag(mut self, tag: impl Into<String>) -> Self {
        self.execution_tag = Some(tag.into());
        self
    }

    /// Switch the context to a new phase.
    pub fn enter_phase(&mut self, phase_name: impl Into<String>) {
        self.phase_name = phase_name.into();
    }

    /// Write a value to the memory store (visible to tool contexts).
    pub fn set_memory(&self, key: impl Into<String>, value: Value) -> CoreResult<()> {
        let mut store = self
            .memory_store
            .write()
            .map_err(|e| CoreError::internal(format!("Memory store lock poisoned: {}", e)))?;
        store.insert(key.into(), value);
        Ok(())
    }

    /// Read a value from the memory store.
    pub fn get_memory(&self, key: &str) -> Option<Value> {
        let store = self.memory_store.read().ok()?;
        store.get(key).cloned()
    }

    /// Create a `ToolContext` for a specific tool call in the current phase.
    pub fn create_tool_context(&self, tool_call_id: impl Into<String>, round: u32) -> ToolContext {
        ToolContext {
            job_id: self.job_id.clone(),
            work_dir: self.work_dir.clone(),
            phase_name: self.phase_name.clone(),
            execution_tag: self.execution_tag.clone(),
            tool_call_id: tool_call_id.into(),
            round,
            memory_store: Arc::clone(&self.memory_store),
        }
    }
}

impl ExecutionContext for PhaseContext {
    fn job_id(&self) -> &str {
        &self.job_id
    }

    fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn phase_name(&self) -> &str {
        &self.phase_name
    }

    fn execution_tag(&self) -> Option<&str> {
        self.execution_tag.as_deref()
    }
}

// ============================================================================
// Tests
// ============================================================================
