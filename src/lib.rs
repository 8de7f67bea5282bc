//! Phasewright - phase-sequenced LLM orchestration
//!
//! Drives a language model through an ordered list of phases. Each phase is
//! a bounded loop of model calls and tool executions that ends when the
//! model signals completion. It includes:
//! - Round loop, sequencer, output sanitizer and completion detection
//! - Progress tracking with tree and stream renderings
//! - Background jobs with SQLite or in-memory persistence
//! - JSON engine config and workflow definitions

pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

// Re-export the contracts the engine is built on
pub use phasewright_core::{CoreError, PhaseContext, ToolContext};
pub use phasewright_llm::{InferenceRequest, InferenceResponse, LlmProvider, ScriptedProvider};
pub use phasewright_tools::{FunctionTool, RecallTool, Tool, ToolRegistry, ToolResult};

pub use models::job::{ConversationEntry, Job, JobStatus};
pub use models::phase::{Phase, PhaseCallback, PhaseControl, PhaseResult, PhaseValidator};
pub use models::settings::EngineConfig;
pub use models::workflow::WorkflowDefinition;
pub use services::{
    JobHandle, JobOutcome, JobRunner, OutputSanitizer, PhaseRunner, PhaseSequencer, ProgressSink,
    ProgressTracker,
};
pub use storage::{ConfigService, Database, InMemoryJobStore, JobStore};
pub use utils::error::{EngineError, EngineResult};
