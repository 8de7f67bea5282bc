//! Phasewright LLM
//!
//! The model invocation contract consumed by the phase engine:
//! - `LlmProvider` - the trait every backend adapter implements
//! - `InferenceRequest` / `InferenceResponse` - one model call
//! - `TextActionFormat` - capability flag selecting the textual
//!   tool-call parsing strategy for backends without reliable native calls
//! - `ScriptedProvider` - deterministic replay backend for tests and dry runs
//!
//! Concrete HTTP adapters live outside this workspace and implement
//! `LlmProvider`.

pub mod provider;
pub mod scripted;
pub mod types;

// Re-export main types
pub use provider::LlmProvider;
pub use scripted::ScriptedProvider;
pub use types::*;
