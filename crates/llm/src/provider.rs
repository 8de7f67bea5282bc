//! LLM Provider Trait
//!
//! Defines the common interface for all model backends.

use async_trait::async_trait;

use super::types::{InferenceRequest, InferenceResponse, LlmResult, TextActionFormat};

/// Trait that all model backends must implement.
///
/// The phase engine only needs a single non-streaming call per round.
/// Cancellation is handled by the caller dropping the returned future, so
/// implementations must be cancel-safe at await points.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Returns the current model being used.
    fn model(&self) -> &str;

    /// Returns whether this provider supports native tool calling.
    fn supports_tools(&self) -> bool;

    /// Returns the textual tool-call convention to parse when a response
    /// carries no native tool calls.
    ///
    /// Default is the generic JSON convention, which most models follow
    /// when tool descriptions are injected into the prompt.
    fn text_action_format(&self) -> TextActionFormat {
        TextActionFormat::GenericJson
    }

    /// Run one inference call.
    async fn infer(&self, request: InferenceRequest) -> LlmResult<InferenceResponse>;

    /// Check if the provider is healthy and reachable.
    async fn health_check(&self) -> LlmResult<()> {
        Ok(())
    }
}
