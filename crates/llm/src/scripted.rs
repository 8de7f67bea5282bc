//! Scripted Provider
//!
//! A deterministic `LlmProvider` that replays a queue of canned responses.
//! Used by the engine's tests and by the CLI's dry-run mode, where a
//! recorded transcript stands in for a live backend.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::provider::LlmProvider;
use crate::types::{InferenceRequest, InferenceResponse, LlmError, LlmResult, TextActionFormat};

/// Replays queued responses in order and records every request it receives.
pub struct ScriptedProvider {
    model: String,
    text_action_format: TextActionFormat,
    turns: Mutex<VecDeque<LlmResult<InferenceResponse>>>,
    /// Returned once the queue is exhausted; `None` makes exhaustion an error.
    fallback: Option<InferenceResponse>,
    delay: Option<Duration>,
    requests: Mutex<Vec<InferenceRequest>>,
}

impl ScriptedProvider {
    /// Create an empty script.
    pub fn new() -> Self {
        Self {
            model: "scripted".to_string(),
            text_action_format: TextActionFormat::GenericJson,
            turns: Mutex::new(VecDeque::new()),
            fallback: None,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a script from a list of responses.
    pub fn from_responses(responses: Vec<InferenceResponse>) -> Self {
        let provider = Self::new();
        {
            let mut turns = provider.turns.lock().unwrap_or_else(|e| e.into_inner());
            turns.extend(responses.into_iter().map(Ok));
        }
        provider
    }

    /// Set the reported model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the textual tool-call convention reported to the engine.
    pub fn with_text_action_format(mut self, format: TextActionFormat) -> Self {
        self.text_action_format = format;
        self
    }

    /// Response to repeat once the queue is empty.
    pub fn with_fallback(mut self, response: InferenceResponse) -> Self {
        self.fallback = Some(response);
        self
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a successful response.
    pub fn push_response(&self, response: InferenceResponse) {
        self.turns
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Ok(response));
    }

    /// Queue a failing call.
    pub fn push_error(&self, error: LlmError) {
        self.turns
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Err(error));
    }

    /// Every request received so far, in call order.
    pub fn requests(&self) -> Vec<InferenceRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Number of queued responses not yet consumed.
    pub fn remaining(&self) -> usize {
        self.turns.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn supports_tools(&self) -> bool {
        true
    }

    fn text_action_format(&self) -> TextActionFormat {
        self.text_action_format
    }

    async fn infer(&self, request: InferenceRequest) -> LlmResult<InferenceResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self
            .turns
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        match next {
            Some(turn) => turn,
            None => match &self.fallback {
                Some(response) => Ok(response.clone()),
                None => {
                    tracing::warn!("[ScriptedProvider] Script exhausted after {} calls", self.call_count());
                    Err(LlmError::other("scripted responses exhausted"))
                }
            },
        }
    }
}
