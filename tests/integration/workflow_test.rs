//! Workflow and Config Integration Tests
//!
//! Files on disk driving real runs:
//! - Engine config creation, edits and custom vocabularies
//! - Workflow files with prompt files and declarative validators
//! - Scripted transcripts loaded from JSON

use std::fs;
use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use phasewright::models::workflow::WorkflowDefinition;
use phasewright::storage::ConfigService;
use phasewright::{EngineConfig, EngineError, InferenceResponse, PhaseContext, PhaseSequencer, ScriptedProvider};

use crate::support::registry;

const WORKFLOW: &str = r#"{
    "name": "refactor",
    "description": "Plan and apply a refactor",
    "phases": [
        {
            "name": "plan",
            "prompt_file": "prompts/plan.md",
            "allowed_tools": ["read"],
            "expects_json": true,
            "validators": [{"type": "required_keys", "keys": ["title", "steps"]}]
        },
        {
            "name": "implement",
            "system_prompt": "Apply the plan.",
            "max_rounds": 4,
            "validators": [{"type": "non_empty"}, {"type": "contains", "value": "tests pass"}]
        }
    ]
}"#;

fn write_workflow(dir: &std::path::Path) -> std::path::PathBuf {
    fs::create_dir_all(dir.join("prompts")).unwrap();
    fs::write(dir.join("prompts/plan.md"), "You are a careful planner.").unwrap();
    let path = dir.join("refactor.json");
    fs::write(&path, WORKFLOW).unwrap();
    path
}

fn run_sequencer(workflow: WorkflowDefinition, config: EngineConfig, provider: Arc<ScriptedProvider>) -> PhaseSequencer {
    let phases = workflow.into_phases().unwrap();
    PhaseSequencer::new(phases, provider, registry(), config, PhaseContext::new("job-wf", "."))
}

#[tokio::test]
async fn test_workflow_file_runs_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let workflow = WorkflowDefinition::load(&write_workflow(dir.path())).unwrap();
    assert_eq!(workflow.name, "refactor");

    let provider = Arc::new(ScriptedProvider::from_responses(vec![
        InferenceResponse::text(r#"{"title": "Extract trait", "steps": ["a", "b"]} PHASE_COMPLETE"#),
        InferenceResponse::text("Refactor applied, tests pass. PHASE_COMPLETE"),
    ]));
    let mut sequencer = run_sequencer(workflow, EngineConfig::default(), provider.clone());
    sequencer.execute(&CancellationToken::new(), "refactor the parser").await.unwrap();

    let requests = provider.requests();
    assert_eq!(requests[0].system_prompt, "You are a careful planner.");
    assert_eq!(requests[1].system_prompt, "Apply the plan.");
    assert_eq!(
        sequencer.phase_result("plan").unwrap().data,
        Some(json!({"title": "Extract trait", "steps": ["a", "b"]}))
    );
}

#[tokio::test]
async fn test_required_keys_validator_rejects_plan() {
    let dir = tempfile::tempdir().unwrap();
    let workflow = WorkflowDefinition::load(&write_workflow(dir.path())).unwrap();

    let provider = Arc::new(ScriptedProvider::from_responses(vec![InferenceResponse::text(
        r#"{"title": "No steps here"} PHASE_COMPLETE"#,
    )]));
    let mut sequencer = run_sequencer(workflow, EngineConfig::default(), provider);
    let err = sequencer.execute(&CancellationToken::new(), "go").await.unwrap_err();

    assert!(matches!(err.root_cause(), EngineError::Validation(_)));
    assert_eq!(
        sequencer.phase_result("plan").unwrap().error.as_deref(),
        Some("validation failed: missing required key 'steps'")
    );
}

#[test]
fn test_missing_prompt_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_workflow(dir.path());
    fs::remove_file(dir.path().join("prompts/plan.md")).unwrap();

    let err = WorkflowDefinition::load(&path).unwrap().into_phases().unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));
}

#[test]
fn test_invalid_workflow_rejected() {
    let err = WorkflowDefinition::from_json(
        r#"{"name": "x", "phases": [{"name": "a"}, {"name": "a"}]}"#,
        ".",
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "validation failed: duplicate phase name: a");
}

#[tokio::test]
async fn test_config_file_drives_engine() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    let mut service = ConfigService::open(&path).unwrap();
    assert!(path.exists());
    service
        .update_config(|c| {
            c.default_max_rounds = 2;
            c.completion_phrases = vec!["ship it".to_string()];
            c.prompts.nudge = "Keep going.".to_string();
        })
        .unwrap();

    let config = ConfigService::open(&path).unwrap().get_config_clone();
    assert_eq!(config.default_max_rounds, 2);

    let workflow = WorkflowDefinition::from_json(r#"{"name": "w", "phases": [{"name": "review"}]}"#, ".").unwrap();
    let provider = Arc::new(ScriptedProvider::from_responses(vec![
        InferenceResponse::text("PHASE_COMPLETE"),
        InferenceResponse::text("Ship it!"),
    ]));
    let mut sequencer = run_sequencer(workflow, config, provider.clone());
    sequencer.execute(&CancellationToken::new(), "go").await.unwrap();

    let result = sequencer.phase_result("review").unwrap();
    assert_eq!(result.rounds_used, 2);
    assert_eq!(provider.requests()[1].user_prompt, "Keep going.");
}

#[test]
fn test_rejected_config_edit_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let mut service = ConfigService::open(&path).unwrap();
    let before = fs::read_to_string(&path).unwrap();

    assert!(service.update_config(|c| c.temperature = 5.0).is_err());
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
    assert_eq!(service.get_config().temperature, 0.2);
}

#[test]
fn test_script_file_parses_into_responses() {
    let raw = r#"[
        {"text": "Reading.", "tool_calls": [{"name": "read", "arguments": {"path": "a.rs"}}]},
        {"text": "PHASE_COMPLETE", "usage": {"input_tokens": 10, "output_tokens": 5}}
    ]"#;
    let responses: Vec<InferenceResponse> = serde_json::from_str(raw).unwrap();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0].tool_calls[0].name, "read");
    assert!(responses[0].tool_calls[0].id.is_empty());
    assert_eq!(responses[1].usage.total_tokens(), 15);
}
