//! Job Runner Integration Tests
//!
//! Background jobs against both job stores:
//! - Lifecycle Pending -> Running -> Completed/Failed
//! - Conversation log contents and order
//! - Cancellation through the handle
//! - Caller stop via phase callback

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use phasewright::models::job::{ConversationRole, JobStatus};
use phasewright::models::phase::{Phase, PhaseControl, PhaseResult};
use phasewright::services::progress::{ChannelSink, RenderMode};
use phasewright::storage::{Database, InMemoryJobStore, JobStore};
use phasewright::{EngineConfig, InferenceResponse, JobRunner, ScriptedProvider};

use crate::support::registry;

fn runner(provider: ScriptedProvider, store: Arc<dyn JobStore>) -> JobRunner {
    JobRunner::new(Arc::new(provider), registry(), EngineConfig::default(), store)
}

fn write_then_complete() -> ScriptedProvider {
    ScriptedProvider::from_responses(vec![
        InferenceResponse::text("Writing.").with_tool_call("write", json!({"path": "src/main.rs"})),
        InferenceResponse::text("PHASE_COMPLETE"),
    ])
}

async fn assert_conversation_logged(store: Arc<dyn JobStore>) {
    let handle = runner(write_then_complete(), store.clone())
        .start("fix", "fix main", vec![Phase::new("implement")], "go")
        .await
        .unwrap();
    let job_id = handle.job_id().to_string();
    assert!(handle.join().await.unwrap().is_success());

    let entries = store.conversation(&job_id).await.unwrap();
    let roles: Vec<ConversationRole> = entries.iter().map(|e| e.role).collect();
    assert_eq!(
        roles,
        vec![
            ConversationRole::System,
            ConversationRole::User,
            ConversationRole::Assistant,
            ConversationRole::ToolCall,
            ConversationRole::ToolResult,
            ConversationRole::User,
            ConversationRole::Assistant,
            ConversationRole::System,
        ]
    );
    assert_eq!(entries[0].content, "Starting phase: implement");
    assert_eq!(entries[3].tool.as_deref(), Some("write"));
    assert_eq!(entries[3].args, Some(json!({"path": "src/main.rs"})));
    assert_eq!(entries[4].success, Some(true));
    assert_eq!(entries[4].result.as_ref().unwrap()["modified_files"], json!(["src/main.rs"]));
    assert!(entries[5].content.starts_with("Tool results:"));
    assert!(entries[7].content.starts_with("Phase results updated: ["));

    let job = store.get_job(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.workflow_type, "fix");
    let phases = &job.output.unwrap()["phases"];
    assert_eq!(phases[0]["modified_files"], json!(["src/main.rs"]));
}

#[tokio::test]
async fn test_conversation_logged_in_memory() {
    assert_conversation_logged(Arc::new(InMemoryJobStore::new())).await;
}

#[tokio::test]
async fn test_conversation_logged_in_sqlite() {
    let store: Arc<dyn JobStore> = Arc::new(Database::new_in_memory().expect("Failed to create in-memory test database"));
    assert_conversation_logged(store).await;
}

#[tokio::test]
async fn test_sqlite_file_store_persists_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jobs").join("phasewright.db");

    let job_id = {
        let store: Arc<dyn JobStore> = Arc::new(Database::new(&path).unwrap());
        let handle = runner(
            ScriptedProvider::from_responses(vec![InferenceResponse::text("PHASE_COMPLETE")]),
            store,
        )
        .start("analyze", "", vec![Phase::new("analyze")], "go")
        .await
        .unwrap();
        let job_id = handle.job_id().to_string();
        handle.join().await.unwrap();
        job_id
    };

    let reopened = Database::new(&path).unwrap();
    let jobs = reopened.list_jobs().await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, job_id);
    assert_eq!(jobs[0].status, JobStatus::Completed);
    assert!(!reopened.conversation(&job_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_handle_cancel_fails_job() {
    let store = Arc::new(InMemoryJobStore::new());
    let provider = ScriptedProvider::from_responses(vec![InferenceResponse::text("PHASE_COMPLETE")])
        .with_delay(Duration::from_secs(30));
    let handle = runner(provider, store.clone())
        .start("slow", "", vec![Phase::new("analyze")], "go")
        .await
        .unwrap();
    let job_id = handle.job_id().to_string();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!handle.is_finished());
    handle.cancel();

    let outcome = tokio::time::timeout(Duration::from_secs(5), handle.join())
        .await
        .expect("cancelled job should finish promptly")
        .unwrap();
    assert_eq!(outcome.status, JobStatus::Failed);
    assert_eq!(outcome.error.as_deref(), Some("phase analyze failed: execution cancelled"));

    let job = store.get_job(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.output.unwrap()["status"], "cancelled");
}

#[tokio::test]
async fn test_callback_stop_marks_job_stopped() {
    let store = Arc::new(InMemoryJobStore::new());
    let provider = ScriptedProvider::from_responses(vec![
        InferenceResponse::text("PHASE_COMPLETE"),
        InferenceResponse::text("PHASE_COMPLETE"),
    ]);
    let runner = runner(provider, store.clone()).with_phase_callback(Arc::new(
        |phase: &Phase, _: &PhaseResult| {
            if phase.name == "plan" {
                Ok(PhaseControl::Stop)
            } else {
                Ok(PhaseControl::Continue)
            }
        },
    ));

    let handle = runner
        .start("review", "", vec![Phase::new("analyze"), Phase::new("plan"), Phase::new("implement")], "go")
        .await
        .unwrap();
    let job_id = handle.job_id().to_string();
    let outcome = handle.join().await.unwrap();

    assert_eq!(outcome.status, JobStatus::Failed);
    assert_eq!(outcome.results.len(), 2);
    assert!(outcome.results.iter().all(|r| r.success));

    let output = store.get_job(&job_id).await.unwrap().unwrap().output.unwrap();
    assert_eq!(output["status"], "stopped");
}

#[tokio::test]
async fn test_sinks_see_progress_from_the_start() {
    let (sink, mut rx) = ChannelSink::new(RenderMode::Tree);
    let provider = ScriptedProvider::from_responses(vec![
        InferenceResponse::text("PHASE_COMPLETE").with_usage(1500, 200),
        InferenceResponse::text("PHASE_COMPLETE"),
    ]);
    let handle = runner(provider, Arc::new(InMemoryJobStore::new()))
        .with_sink(Arc::new(sink))
        .start("review", "", vec![Phase::new("analyze"), Phase::new("plan")], "go")
        .await
        .unwrap();
    let tracker = handle.tracker();
    handle.join().await.unwrap();

    assert_eq!(rx.try_recv().unwrap(), "└─ ⏳ analyze\n");
    let mut last = String::new();
    while let Ok(frame) = rx.try_recv() {
        last = frame;
    }
    assert_eq!(last, tracker.render_tree());
    assert!(last.starts_with("├─ ✓ analyze . 0 tool uses . 1.7k tokens\n"));
}
