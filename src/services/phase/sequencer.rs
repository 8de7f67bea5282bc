//! Phase Sequencer
//!
//! Runs an ordered list of phases through the round loop. Each phase's
//! output is parsed, validated, persisted, sanitized, and handed to the
//! next phase as its input. The first failure stops the sequence.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use phasewright_core::{ExecutionContext, PhaseContext};
use phasewright_llm::LlmProvider;
use phasewright_tools::ToolRegistry;

use crate::models::job::ConversationEntry;
use crate::models::phase::{Phase, PhaseCallback, PhaseControl, PhaseResult};
use crate::models::progress::PhaseStatus;
use crate::models::settings::EngineConfig;
use crate::services::phase::extraction::extract_json_object;
use crate::services::phase::round_loop::PhaseRunner;
use crate::services::phase::sanitizer::{OutputSanitizer, PathHeuristic};
use crate::services::progress::ProgressTracker;
use crate::storage::store::JobStore;
use crate::utils::error::{EngineError, EngineResult};

/// Input handed to the phase after `previous`
pub fn build_next_phase_input(previous: &str, sanitized_output: &str) -> String {
    format!("# Previous Phase: {}\n\n## Output\n{}", previous, sanitized_output)
}

pub struct PhaseSequencer {
    phases: Vec<Phase>,
    runner: PhaseRunner,
    sanitizer: OutputSanitizer,
    context: PhaseContext,
    store: Option<Arc<dyn JobStore>>,
    tracker: Arc<ProgressTracker>,
    callback: Option<PhaseCallback>,
    results: Vec<PhaseResult>,
    current_phase: usize,
}

impl PhaseSequencer {
    pub fn new(
        phases: Vec<Phase>,
        provider: Arc<dyn LlmProvider>,
        registry: Arc<ToolRegistry>,
        config: EngineConfig,
        context: PhaseContext,
    ) -> Self {
        let sanitizer = OutputSanitizer::new(config.sanitizer.clone());
        let tracker = Arc::new(ProgressTracker::new());
        let runner = PhaseRunner::new(provider, registry, Arc::new(config)).with_tracker(Arc::clone(&tracker));
        Self {
            phases,
            runner,
            sanitizer,
            context,
            store: None,
            tracker,
            callback: None,
            results: Vec::new(),
            current_phase: 0,
        }
    }

    /// Persist conversation and results to `store`
    pub fn with_store(mut self, store: Arc<dyn JobStore>) -> Self {
        self.runner = self.runner.with_store(Arc::clone(&store));
        self.store = Some(store);
        self
    }

    /// Share an externally owned tracker
    pub fn with_tracker(mut self, tracker: Arc<ProgressTracker>) -> Self {
        self.runner = self.runner.with_tracker(Arc::clone(&tracker));
        self.tracker = tracker;
        self
    }

    /// Called after each successful phase; may stop the sequence
    pub fn with_phase_callback(mut self, callback: PhaseCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn with_path_heuristic(mut self, heuristic: PathHeuristic) -> Self {
        self.sanitizer = self.sanitizer.with_path_heuristic(heuristic);
        self
    }

    /// Run every phase in order starting from `initial_input`.
    ///
    /// On failure the error names the phase; results recorded so far stay
    /// available through `all_results`.
    pub async fn execute(&mut self, cancel: &CancellationToken, initial_input: &str) -> EngineResult<()> {
        let mut seen = HashSet::new();
        for phase in &self.phases {
            if !seen.insert(phase.name.as_str()) {
                return Err(EngineError::validation(format!("duplicate phase name: {}", phase.name)));
            }
        }

        for phase in &self.phases {
            self.tracker.add_phase(&phase.name);
        }

        let phases = self.phases.clone();
        let total = phases.len();
        let mut input = initial_input.to_string();

        for (index, phase) in phases.iter().enumerate() {
            self.current_phase = index;
            self.context.enter_phase(&phase.name);
            tracing::info!("[PhaseSequencer] Starting phase {}/{}: {}", index + 1, total, phase.name);
            self.log(ConversationEntry::system(format!("Starting phase: {}", phase.name)))
                .await;

            let mut result = PhaseResult::started(&phase.name);
            let run = self
                .runner
                .run(phase, &self.context, &input, cancel, &mut result)
                .await;

            let output = match run {
                Ok(output) => output,
                Err(e) => {
                    let rounds = result.rounds_used;
                    result.fail(e.to_string(), rounds);
                    return Err(self.fail_phase(phase, result, e).await);
                }
            };
            let rounds = result.rounds_used;
            result.succeed(output, rounds);

            if phase.expects_json {
                result.data = extract_json_object(&result.output);
                if result.data.is_none() {
                    tracing::warn!("[PhaseSequencer] Phase {} produced no JSON object", phase.name);
                }
            }

            if let Some(validator) = &phase.validator {
                if let Err(reason) = validator(&result) {
                    let err = EngineError::validation(reason);
                    result.success = false;
                    result.error = Some(err.to_string());
                    return Err(self.fail_phase(phase, result, err).await);
                }
            }

            self.tracker.update_phase(&phase.name, PhaseStatus::Done, "");
            self.remember(phase, &result);
            let sanitized = self.sanitizer.sanitize(&phase.name, &result.output);
            let snapshot = result.clone();
            self.record(result).await;
            tracing::info!(
                "[PhaseSequencer] Phase {} completed in {} round(s)",
                phase.name,
                snapshot.rounds_used
            );

            if let Some(callback) = &self.callback {
                match callback(phase, &snapshot) {
                    Ok(PhaseControl::Continue) => {}
                    Ok(PhaseControl::Stop) => {
                        tracing::info!("[PhaseSequencer] Stopped by callback after phase {}", phase.name);
                        return Err(EngineError::in_phase(
                            &phase.name,
                            EngineError::Stopped(phase.name.clone()),
                        ));
                    }
                    Err(msg) => {
                        return Err(EngineError::in_phase(&phase.name, EngineError::Callback(msg)));
                    }
                }
            }

            input = build_next_phase_input(&phase.name, &sanitized);
        }

        self.current_phase = total;
        tracing::info!("[PhaseSequencer] All {} phase(s) completed", total);
        Ok(())
    }

    /// Results of every phase that ran, in execution order
    pub fn all_results(&self) -> &[PhaseResult] {
        &self.results
    }

    pub fn phase_result(&self, name: &str) -> Option<&PhaseResult> {
        self.results.iter().find(|r| r.phase_name == name)
    }

    /// Index of the running phase, or of the one that failed.
    ///
    /// Equals the phase count once every phase has succeeded.
    pub fn current_phase_index(&self) -> usize {
        self.current_phase
    }

    pub fn tracker(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.tracker)
    }

    pub fn context(&self) -> &PhaseContext {
        &self.context
    }

    async fn fail_phase(&mut self, phase: &Phase, result: PhaseResult, err: EngineError) -> EngineError {
        tracing::error!("[PhaseSequencer] Phase {} failed: {}", phase.name, err);
        self.tracker
            .set_phase_error(&phase.name, result.error.clone().unwrap_or_else(|| err.to_string()));
        self.record(result).await;
        EngineError::in_phase(&phase.name, err)
    }

    /// Keep the raw output where tools can recall it
    fn remember(&self, phase: &Phase, result: &PhaseResult) {
        let output = Value::String(result.output.clone());
        if let Err(e) = self.context.set_memory(format!("{}_output", phase.name), output.clone()) {
            tracing::warn!("[PhaseSequencer] Failed to store output of {}: {}", phase.name, e);
        }

        let sanitizer = self.sanitizer.config();
        if sanitizer.is_planning_phase(&phase.name) {
            let plan = result.data.clone().unwrap_or(output);
            if let Err(e) = self.context.set_memory(sanitizer.recall_key.clone(), plan) {
                tracing::warn!("[PhaseSequencer] Failed to store plan: {}", e);
            }
        }
    }

    /// Store a result (replacing an earlier one for the same phase) and
    /// append a snapshot of all results to the conversation
    async fn record(&mut self, result: PhaseResult) {
        match self.results.iter_mut().find(|r| r.phase_name == result.phase_name) {
            Some(existing) => *existing = result,
            None => self.results.push(result),
        }

        if self.store.is_none() {
            return;
        }
        match serde_json::to_string(&self.results) {
            Ok(json) => {
                self.log(ConversationEntry::system(format!("Phase results updated: {}", json)))
                    .await
            }
            Err(e) => tracing::warn!("[PhaseSequencer] Failed to serialize phase results: {}", e),
        }
    }

    async fn log(&self, entry: ConversationEntry) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.append_conversation(self.context.job_id(), &entry).await {
            tracing::warn!("[PhaseSequencer] Failed to append conversation entry: {}", e);
        }
    }
}
