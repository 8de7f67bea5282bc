//! Job Store
//!
//! Persistence contract for jobs and their conversation logs.

use async_trait::async_trait;
use serde_json::Value;

use crate::models::job::{ConversationEntry, Job, JobStatus};
use crate::utils::error::EngineResult;

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create_job(&self, job: &Job) -> EngineResult<()>;

    async fn get_job(&self, job_id: &str) -> EngineResult<Option<Job>>;

    /// All jobs, newest first
    async fn list_jobs(&self) -> EngineResult<Vec<Job>>;

    /// Move a job to `status`, attaching output and error when given.
    ///
    /// Fails with `NotFound` for an unknown job and `InvalidTransition` when
    /// the move is not allowed (terminal states are final).
    async fn update_job_status(
        &self,
        job_id: &str,
        status: JobStatus,
        output: Option<Value>,
        error: Option<String>,
    ) -> EngineResult<Job>;

    async fn append_conversation(&self, job_id: &str, entry: &ConversationEntry) -> EngineResult<()>;

    /// Conversation entries in append order
    async fn conversation(&self, job_id: &str) -> EngineResult<Vec<ConversationEntry>>;
}
