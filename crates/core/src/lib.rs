//! Phasewright Core
//!
//! Foundational types shared by every crate in the phasewright workspace.
//! This crate depends on nothing else in the workspace.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `context` - Execution context hierarchy (`ExecutionContext`, `ToolContext`, `PhaseContext`)
//! - `schema` - JSON-schema subset used to describe tool parameters (`ParameterSchema`)

pub mod context;
pub mod error;
pub mod schema;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Context Hierarchy ──────────────────────────────────────────────────
pub use context::{ExecutionContext, MemoryStore, PhaseContext, ToolContext};

// ── Parameter Schemas ──────────────────────────────────────────────────
pub use schema::ParameterSchema;
