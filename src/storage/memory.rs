//! In-Memory Job Store
//!
//! Process-local `JobStore` used by tests and one-shot CLI runs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::models::job::{ConversationEntry, Job, JobStatus};
use crate::storage::store::JobStore;
use crate::utils::error::{EngineError, EngineResult};

#[derive(Default)]
struct Inner {
    jobs: HashMap<String, Job>,
    conversations: HashMap<String, Vec<ConversationEntry>>,
}

#[derive(Clone, Default)]
pub struct InMemoryJobStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create_job(&self, job: &Job) -> EngineResult<()> {
        let mut inner = self.inner.write().await;
        if inner.jobs.contains_key(&job.id) {
            return Err(EngineError::validation(format!("job {} already exists", job.id)));
        }
        inner.jobs.insert(job.id.clone(), job.clone());
        inner.conversations.insert(job.id.clone(), Vec::new());
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> EngineResult<Option<Job>> {
        Ok(self.inner.read().await.jobs.get(job_id).cloned())
    }

    async fn list_jobs(&self) -> EngineResult<Vec<Job>> {
        let inner = self.inner.read().await;
        let mut jobs: Vec<Job> = inner.jobs.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn update_job_status(
        &self,
        job_id: &str,
        status: JobStatus,
        output: Option<Value>,
        error: Option<String>,
    ) -> EngineResult<Job> {
        let mut inner = self.inner.write().await;
        let job = inner
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| EngineError::not_found(format!("job {}", job_id)))?;
        let from = job.status;
        if !job.apply_status(status, output, error) {
            return Err(EngineError::InvalidTransition {
                from: from.to_string(),
                to: status.to_string(),
            });
        }
        Ok(job.clone())
    }

    async fn append_conversation(&self, job_id: &str, entry: &ConversationEntry) -> EngineResult<()> {
        let mut inner = self.inner.write().await;
        let log = inner
            .conversations
            .get_mut(job_id)
            .ok_or_else(|| EngineError::not_found(format!("job {}", job_id)))?;
        log.push(entry.clone());
        Ok(())
    }

    async fn conversation(&self, job_id: &str) -> EngineResult<Vec<ConversationEntry>> {
        let inner = self.inner.read().await;
        inner
            .conversations
            .get(job_id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(format!("job {}", job_id)))
    }
}
