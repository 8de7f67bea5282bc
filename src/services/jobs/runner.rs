//! Job Runner
//!
//! Runs a phase sequence as a background job. `start` persists the job and
//! returns a handle immediately; the sequence runs on a spawned task that
//! moves the job through Running to Completed or Failed.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use phasewright_core::PhaseContext;
use phasewright_llm::LlmProvider;
use phasewright_tools::ToolRegistry;

use crate::models::job::{Job, JobStatus};
use crate::models::phase::{Phase, PhaseCallback, PhaseResult};
use crate::models::settings::EngineConfig;
use crate::services::phase::sequencer::PhaseSequencer;
use crate::services::progress::{ProgressSink, ProgressTracker};
use crate::storage::store::JobStore;
use crate::utils::error::{EngineError, EngineResult};

/// Final state of a finished job
#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    pub job_id: String,
    pub status: JobStatus,
    /// Results of every phase that ran, in order
    pub results: Vec<PhaseResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Completed
    }
}

/// Handle to a running job
pub struct JobHandle {
    job_id: String,
    tracker: Arc<ProgressTracker>,
    cancel: CancellationToken,
    task: JoinHandle<JobOutcome>,
}

impl JobHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn tracker(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.tracker)
    }

    /// Request cancellation; the in-flight model or tool call is abandoned
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the job to reach a terminal state
    pub async fn join(self) -> EngineResult<JobOutcome> {
        self.task
            .await
            .map_err(|e| EngineError::internal(format!("job task failed: {}", e)))
    }
}

/// Starts phase sequences as background jobs
#[derive(Clone)]
pub struct JobRunner {
    provider: Arc<dyn LlmProvider>,
    registry: Arc<ToolRegistry>,
    config: Arc<EngineConfig>,
    store: Arc<dyn JobStore>,
    work_dir: PathBuf,
    callback: Option<PhaseCallback>,
    sinks: Vec<Arc<dyn ProgressSink>>,
}

impl JobRunner {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        registry: Arc<ToolRegistry>,
        config: EngineConfig,
        store: Arc<dyn JobStore>,
    ) -> Self {
        Self {
            provider,
            registry,
            config: Arc::new(config),
            store,
            work_dir: PathBuf::from("."),
            callback: None,
            sinks: Vec::new(),
        }
    }

    /// Directory tools resolve relative paths against
    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn with_phase_callback(mut self, callback: PhaseCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Attach a sink to the tracker of every job started afterwards
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn store(&self) -> Arc<dyn JobStore> {
        Arc::clone(&self.store)
    }

    /// Create a pending job and run `phases` on a background task.
    ///
    /// Only a failure to create the job is returned here; everything after
    /// that is reported through the job record and the outcome.
    pub async fn start(
        &self,
        workflow_type: &str,
        description: &str,
        phases: Vec<Phase>,
        input: &str,
    ) -> EngineResult<JobHandle> {
        let job = Job::new(workflow_type, description);
        self.store.create_job(&job).await?;
        tracing::info!("[JobRunner] Created job {} ({})", job.id, workflow_type);

        let tracker = Arc::new(ProgressTracker::new());
        for sink in &self.sinks {
            tracker.add_sink(Arc::clone(sink));
        }
        for phase in &phases {
            tracker.add_phase(&phase.name);
        }

        let cancel = CancellationToken::new();
        let context = PhaseContext::new(job.id.clone(), self.work_dir.clone());
        let mut sequencer = PhaseSequencer::new(
            phases,
            Arc::clone(&self.provider),
            Arc::clone(&self.registry),
            (*self.config).clone(),
            context,
        )
        .with_store(Arc::clone(&self.store))
        .with_tracker(Arc::clone(&tracker));
        if let Some(callback) = &self.callback {
            sequencer = sequencer.with_phase_callback(Arc::clone(callback));
        }

        let task = tokio::spawn(run_job(
            job.id.clone(),
            workflow_type.to_string(),
            sequencer,
            Arc::clone(&self.store),
            cancel.clone(),
            input.to_string(),
        ));

        Ok(JobHandle {
            job_id: job.id,
            tracker,
            cancel,
            task,
        })
    }
}

/// Status label recorded in the job output
fn outcome_label(result: &EngineResult<()>) -> &'static str {
    match result {
        Ok(()) => "completed",
        Err(e) if e.is_stop() => "stopped",
        Err(e) if e.is_cancelled() => "cancelled",
        Err(_) => "failed",
    }
}

fn build_output(label: &str, workflow_type: &str, results: &[PhaseResult]) -> Value {
    json!({
        "status": label,
        "workflow_type": workflow_type,
        "phases": results,
    })
}

async fn run_job(
    job_id: String,
    workflow_type: String,
    mut sequencer: PhaseSequencer,
    store: Arc<dyn JobStore>,
    cancel: CancellationToken,
    input: String,
) -> JobOutcome {
    if let Err(e) = store
        .update_job_status(&job_id, JobStatus::Running, None, None)
        .await
    {
        tracing::warn!("[JobRunner] Failed to mark job {} running: {}", job_id, e);
    }

    let result = sequencer.execute(&cancel, &input).await;
    let results = sequencer.all_results().to_vec();
    let output = build_output(outcome_label(&result), &workflow_type, &results);

    let (status, error) = match &result {
        Ok(()) => {
            tracing::info!("[JobRunner] Job {} completed", job_id);
            (JobStatus::Completed, None)
        }
        Err(e) => {
            tracing::warn!("[JobRunner] Job {} failed: {}", job_id, e);
            (JobStatus::Failed, Some(e.to_string()))
        }
    };

    if let Err(e) = store
        .update_job_status(&job_id, status, Some(output), error.clone())
        .await
    {
        tracing::warn!("[JobRunner] Failed to record final status of job {}: {}", job_id, e);
    }

    JobOutcome {
        job_id,
        status,
        results,
        error,
    }
}
