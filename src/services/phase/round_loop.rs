//! Round Loop
//!
//! Drives one phase through bounded rounds of: model call, action
//! extraction, allowed-set filtering, sequential tool execution, completion
//! check, feedback. Model errors and cancellation end the phase; tool
//! failures are fed back to the model.

use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use phasewright_core::{ExecutionContext, PhaseContext};
use phasewright_llm::{InferenceRequest, InferenceResponse, LlmProvider};
use phasewright_tools::{build_tool_call_instructions, truncate_output, ToolRegistry, ToolResult};

use crate::models::job::ConversationEntry;
use crate::models::phase::{Phase, PhaseResult, ToolCallSummary};
use crate::models::progress::PhaseStatus;
use crate::models::settings::EngineConfig;
use crate::services::phase::completion::CompletionDetector;
use crate::services::phase::extraction::{extract_actions, RequestedAction};
use crate::services::progress::ProgressTracker;
use crate::storage::store::JobStore;
use crate::utils::error::{EngineError, EngineResult};

/// Runs the round loop for single phases
#[derive(Clone)]
pub struct PhaseRunner {
    provider: Arc<dyn LlmProvider>,
    registry: Arc<ToolRegistry>,
    config: Arc<EngineConfig>,
    detector: CompletionDetector,
    store: Option<Arc<dyn JobStore>>,
    tracker: Option<Arc<ProgressTracker>>,
}

impl PhaseRunner {
    pub fn new(provider: Arc<dyn LlmProvider>, registry: Arc<ToolRegistry>, config: Arc<EngineConfig>) -> Self {
        let detector = CompletionDetector::from_config(&config);
        Self {
            provider,
            registry,
            config,
            detector,
            store: None,
            tracker: None,
        }
    }

    /// Log prompts, responses and tool calls to this store
    pub fn with_store(mut self, store: Arc<dyn JobStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Report rounds, tokens and tool uses to this tracker
    pub fn with_tracker(mut self, tracker: Arc<ProgressTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `phase` starting from `input`, returning the completing round's text.
    ///
    /// `result` collects rounds used and tool-call summaries; it keeps
    /// whatever was recorded when an error is returned.
    pub async fn run(
        &self,
        phase: &Phase,
        ctx: &PhaseContext,
        input: &str,
        cancel: &CancellationToken,
        result: &mut PhaseResult,
    ) -> EngineResult<String> {
        let budget = phase.effective_budget(self.config.default_max_rounds);
        let system_prompt = self.system_prompt_for(phase);
        let catalog = if self.config.enable_tools && self.provider.supports_tools() {
            self.registry.definitions_for(&phase.allowed_tools)
        } else {
            Vec::new()
        };
        let text_format = self.provider.text_action_format();
        let mut prompt = input.to_string();

        for round in 1..=budget {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            result.rounds_used = round;

            tracing::info!("[RoundLoop] Phase {} round {}/{}", phase.name, round, budget);
            if let Some(tracker) = &self.tracker {
                tracker.update_phase(&phase.name, PhaseStatus::InProgress, format!("round {}/{}", round, budget));
            }

            self.log(ctx, ConversationEntry::user(&prompt)).await;

            let mut request = InferenceRequest::new(&system_prompt, &prompt);
            request.temperature = self.config.temperature;
            request.max_tokens = self.config.max_tokens;
            request.tools = catalog.clone();
            if prompt.starts_with(&self.config.prompts.feedback_header) {
                request.logit_bias = phase.logit_bias.clone();
            }

            let response = self.infer(request, cancel).await?;

            if let Some(tracker) = &self.tracker {
                tracker.add_tokens(&phase.name, u64::from(response.usage.total_tokens()));
            }
            self.log(ctx, ConversationEntry::assistant(&response.text)).await;

            let actions = extract_actions(&response, text_format);
            if actions.is_empty() {
                if self.detector.text_signals_completion(&response.text) {
                    tracing::info!("[RoundLoop] Phase {} complete after {} round(s)", phase.name, round);
                    return Ok(response.text);
                }
                tracing::debug!("[RoundLoop] No actions and no completion signal, nudging");
                prompt = self.config.prompts.nudge.clone();
                continue;
            }

            let actions = self.filter_actions(phase, actions);

            let mut executed: Vec<(String, ToolResult)> = Vec::with_capacity(actions.len());
            for action in actions {
                let tool_result = self.execute_action(phase, ctx, round, &action, cancel).await?;
                result.record_tool_call(ToolCallSummary::from_result(&action.name, &tool_result));
                executed.push((action.name, tool_result));
            }

            if self.detector.text_signals_completion(&response.text) {
                tracing::info!("[RoundLoop] Phase {} complete after {} round(s)", phase.name, round);
                return Ok(response.text);
            }

            let feedback = self.build_feedback(&executed);

            if self
                .detector
                .tool_results_signal_completion(executed.iter().map(|(_, r)| r))
            {
                tracing::info!("[RoundLoop] Phase {} completed by tool result marker", phase.name);
                return Ok(response.text);
            }

            prompt = feedback;
        }

        tracing::warn!("[RoundLoop] Phase {} exhausted its {} round budget", phase.name, budget);
        Err(EngineError::MaxRounds(budget))
    }

    fn system_prompt_for(&self, phase: &Phase) -> String {
        let base = if phase.system_prompt.is_empty() {
            self.config.default_system_prompt.clone().unwrap_or_default()
        } else {
            phase.system_prompt.clone()
        };

        if !self.config.enable_tools || self.provider.supports_tools() {
            return base;
        }

        let instructions = build_tool_call_instructions(
            &self.registry.definitions_for(&phase.allowed_tools),
            self.provider.text_action_format(),
        );
        match (base.is_empty(), instructions.is_empty()) {
            (_, true) => base,
            (true, false) => instructions,
            (false, false) => format!("{}\n\n{}", base, instructions),
        }
    }

    async fn infer(&self, request: InferenceRequest, cancel: &CancellationToken) -> EngineResult<InferenceResponse> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("[RoundLoop] Cancelled during model call");
                Err(EngineError::Cancelled)
            }
            response = self.provider.infer(request) => response.map_err(EngineError::from),
        }
    }

    /// Drop actions naming tools outside the phase's allowed set
    fn filter_actions(&self, phase: &Phase, actions: Vec<RequestedAction>) -> Vec<RequestedAction> {
        actions
            .into_iter()
            .filter(|action| {
                let allowed = phase.allows_tool(&action.name);
                if !allowed {
                    tracing::warn!(
                        "[RoundLoop] Dropping call to {} (not allowed in phase {})",
                        action.name,
                        phase.name
                    );
                }
                allowed
            })
            .collect()
    }

    async fn execute_action(
        &self,
        phase: &Phase,
        ctx: &PhaseContext,
        round: u32,
        action: &RequestedAction,
        cancel: &CancellationToken,
    ) -> EngineResult<ToolResult> {
        self.log(ctx, ConversationEntry::tool_call(&action.name, action.arguments.clone()))
            .await;

        let tool_ctx = ctx.create_tool_context(&action.id, round);
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("[RoundLoop] Cancelled during tool {}", action.name);
                return Err(EngineError::Cancelled);
            }
            outcome = self.registry.execute(&action.name, &tool_ctx, action.arguments.clone()) => outcome,
        };

        let tool_result = match outcome {
            Ok(r) => r,
            Err(e) => ToolResult::err(format!("tool execution error: {}", e)),
        };
        if !tool_result.success {
            tracing::warn!("[RoundLoop] Tool {} failed: {}", action.name, tool_result.error_text());
        }

        if let Some(tracker) = &self.tracker {
            tracker.increment_tool_use(&phase.name);
        }
        self.log(
            ctx,
            ConversationEntry::tool_result(
                &action.name,
                json!({
                    "output": tool_result.output,
                    "error": tool_result.error,
                    "modified_files": tool_result.modified_resources,
                }),
                tool_result.success,
            ),
        )
        .await;

        Ok(tool_result)
    }

    /// Feedback prompt for the next round
    pub fn build_feedback(&self, executed: &[(String, ToolResult)]) -> String {
        let limit = self.config.feedback_truncate_chars;
        let mut feedback = format!("{}\n\n", self.config.prompts.feedback_header);
        for (name, result) in executed {
            if result.success {
                feedback.push_str(&format!("✅ {}: {}\n", name, truncate_output(&result.output, limit)));
            } else {
                feedback.push_str(&format!(
                    "❌ {} failed: {}\n",
                    name,
                    truncate_output(result.error_text(), limit)
                ));
            }
        }
        feedback.push('\n');
        feedback.push_str(&self.config.prompts.feedback_footer);
        feedback
    }

    async fn log(&self, ctx: &PhaseContext, entry: ConversationEntry) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.append_conversation(ctx.job_id(), &entry).await {
            tracing::warn!("[RoundLoop] Failed to append conversation entry: {}", e);
        }
    }
}
