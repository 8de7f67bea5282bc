//! Phase Sequencer Integration Tests
//!
//! End-to-end runs of multi-phase sequences against scripted model
//! transcripts:
//! - Three-phase success with chained, sanitized inputs
//! - Validator failure stopping the sequence
//! - Allowed-set filtering of tool calls and catalogs
//! - Structured data on expects-JSON phases
//! - Round budgets, completion markers and cancellation

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use phasewright::models::phase::Phase;
use phasewright::models::progress::PhaseStatus;
use phasewright::{EngineError, InferenceResponse, ScriptedProvider};

use crate::support::sequencer;

fn scripted(responses: Vec<InferenceResponse>) -> Arc<ScriptedProvider> {
    Arc::new(ScriptedProvider::from_responses(responses))
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_three_phase_success() {
    let provider = scripted(vec![
        InferenceResponse::text("Looking at the cache module.").with_tool_call("read", json!({"path": "src/cache.rs"})),
        InferenceResponse::text("The cache never evicts. PHASE_COMPLETE"),
        InferenceResponse::text(
            r#"{"title": "Add LRU eviction", "steps": [{"id": 1}, {"id": 2}]} PHASE_COMPLETE"#,
        ),
        InferenceResponse::text("Writing the eviction policy.").with_tool_call("write", json!({"path": "src/cache.rs"})),
        InferenceResponse::text("Eviction implemented and tested.\nTASK_COMPLETE"),
    ]);
    let mut sequencer = sequencer(
        vec![
            Phase::new("analyze").with_allowed_tools(["read"]),
            Phase::new("plan").expecting_json(),
            Phase::new("implement"),
        ],
        provider.clone(),
    );

    sequencer
        .execute(&CancellationToken::new(), "Make the cache bounded")
        .await
        .unwrap();

    let results = sequencer.all_results();
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.success));
    assert_eq!(results[0].rounds_used, 2);
    assert_eq!(results[1].rounds_used, 1);
    assert_eq!(results[2].modified_files, vec!["src/cache.rs"]);
    assert_eq!(sequencer.current_phase_index(), 3);

    let requests = provider.requests();
    assert_eq!(requests.len(), 5);
    assert_eq!(requests[0].user_prompt, "Make the cache bounded");
    assert!(requests[1].user_prompt.starts_with("Tool results:\n\n✅ read: contents of src/cache.rs"));
    assert_eq!(
        requests[2].user_prompt,
        "# Previous Phase: analyze\n\n## Output\nThe cache never evicts. PHASE_COMPLETE"
    );

    let implement_input = &requests[3].user_prompt;
    assert!(implement_input.starts_with("# Previous Phase: plan\n\n## Output\nA detailed implementation plan was created."));
    assert!(implement_input.contains("Title: Add LRU eviction"));
    assert!(implement_input.contains("Total steps: 2"));
    assert!(!implement_input.contains("\"steps\""));

    let tracker = sequencer.tracker();
    assert!(tracker.phases().iter().all(|p| p.status == PhaseStatus::Done));
    assert_eq!(tracker.phase("implement").unwrap().tool_uses, 1);
}

#[tokio::test]
async fn test_analyze_implement_verify() {
    let provider = scripted(vec![
        InferenceResponse::text("Searching for the retry helper.").with_tool_call("search", json!({"pattern": "retry"})),
        InferenceResponse::text("The retry helper ignores backoff. PHASE_COMPLETE"),
        InferenceResponse::text("Adding backoff.").with_tool_call("edit", json!({"path": "src/retry.rs"})),
        InferenceResponse::text("Backoff added. PHASE_COMPLETE"),
        InferenceResponse::text("Verified the backoff schedule. PHASE_COMPLETE"),
    ]);
    let mut sequencer = sequencer(
        vec![
            Phase::new("analyze").with_max_rounds(3),
            Phase::new("implement").with_max_rounds(3),
            Phase::new("verify").with_max_rounds(2),
        ],
        provider.clone(),
    );

    sequencer
        .execute(&CancellationToken::new(), "Add backoff to retries")
        .await
        .unwrap();

    let results = sequencer.all_results();
    let names: Vec<&str> = results.iter().map(|r| r.phase_name.as_str()).collect();
    assert_eq!(names, vec!["analyze", "implement", "verify"]);
    assert!(results.iter().all(|r| r.success));
    assert_eq!(results[0].rounds_used, 2);
    assert_eq!(results[0].tool_calls[0].output, "2 matches for retry");
    assert_eq!(results[1].rounds_used, 2);
    assert_eq!(results[1].modified_files, vec!["src/retry.rs"]);
    assert_eq!(results[2].rounds_used, 1);
    assert!(results[2].tool_calls.is_empty());
    assert_eq!(provider.call_count(), 5);
    assert_eq!(sequencer.current_phase_index(), 3);
}

#[tokio::test]
async fn test_validator_failure_stops_sequence() {
    let provider = scripted(vec![InferenceResponse::text("Here is a plan. PHASE_COMPLETE")]);
    let plan = Phase::new("plan").with_validator(|result| {
        if result.output.contains("steps") {
            Ok(())
        } else {
            Err("plan has no steps".to_string())
        }
    });
    let mut sequencer = sequencer(vec![plan, Phase::new("implement")], provider.clone());

    let err = sequencer.execute(&CancellationToken::new(), "go").await.unwrap_err();

    assert_eq!(err.to_string(), "phase plan failed: validation failed: plan has no steps");
    assert!(matches!(err.root_cause(), EngineError::Validation(_)));
    assert_eq!(provider.call_count(), 1);

    let result = sequencer.phase_result("plan").unwrap();
    assert!(!result.success);
    assert_eq!(result.output, "Here is a plan. PHASE_COMPLETE");
    assert_eq!(result.error.as_deref(), Some("validation failed: plan has no steps"));
    assert!(sequencer.phase_result("implement").is_none());
    assert_eq!(sequencer.tracker().phase("plan").unwrap().status, PhaseStatus::Failed);
}

#[tokio::test]
async fn test_tool_filtering() {
    let provider = scripted(vec![
        InferenceResponse::text("Reading then writing.")
            .with_tool_call("write", json!({"path": "src/lib.rs"}))
            .with_tool_call("read", json!({"path": "src/lib.rs"})),
        InferenceResponse::text("Review complete. PHASE_COMPLETE"),
    ]);
    let mut sequencer = sequencer(vec![Phase::new("review").with_allowed_tools(["read"])], provider.clone());

    sequencer.execute(&CancellationToken::new(), "review").await.unwrap();

    let result = sequencer.phase_result("review").unwrap();
    assert_eq!(result.tool_calls.len(), 1);
    assert_eq!(result.tool_calls[0].tool_name, "read");
    assert!(result.modified_files.is_empty());

    let requests = provider.requests();
    let catalog: Vec<&str> = requests[0].tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(catalog, vec!["read"]);
    assert!(!requests[1].user_prompt.contains("write"));
}

#[tokio::test]
async fn test_expects_json_populates_data() {
    let provider = scripted(vec![
        InferenceResponse::text("Plan:\n{\"title\": \"Split module\", \"steps\": [1, 2, 3]}\nPHASE_COMPLETE"),
        InferenceResponse::text("{\"ignored\": true} PHASE_COMPLETE"),
    ]);
    let mut sequencer = sequencer(
        vec![Phase::new("plan").expecting_json(), Phase::new("implement")],
        provider,
    );

    sequencer.execute(&CancellationToken::new(), "go").await.unwrap();

    let plan = sequencer.phase_result("plan").unwrap();
    assert_eq!(plan.data, Some(json!({"title": "Split module", "steps": [1, 2, 3]})));
    assert!(sequencer.phase_result("implement").unwrap().data.is_none());
    assert_eq!(
        sequencer.context().get_memory("implementation_plan"),
        Some(json!({"title": "Split module", "steps": [1, 2, 3]}))
    );
}

// ============================================================================
// Round loop properties
// ============================================================================

#[tokio::test]
async fn test_max_rounds_uses_whole_budget() {
    let provider = Arc::new(ScriptedProvider::new().with_fallback(InferenceResponse::text("still thinking")));
    let mut sequencer = sequencer(vec![Phase::new("implement").with_max_rounds(3)], provider.clone());

    let err = sequencer.execute(&CancellationToken::new(), "go").await.unwrap_err();

    assert!(matches!(err.root_cause(), EngineError::MaxRounds(3)));
    assert_eq!(provider.call_count(), 3);
    let result = sequencer.phase_result("implement").unwrap();
    assert!(!result.success);
    assert_eq!(result.rounds_used, 3);
}

#[tokio::test]
async fn test_tool_call_with_completion_ends_round() {
    let provider = scripted(vec![
        InferenceResponse::text("Searched it. PHASE_COMPLETE").with_tool_call("search", json!({"pattern": "TODO"})),
        InferenceResponse::text("Nothing left. PHASE_COMPLETE"),
    ]);
    let mut sequencer = sequencer(vec![Phase::new("analyze"), Phase::new("verify")], provider.clone());

    sequencer.execute(&CancellationToken::new(), "go").await.unwrap();

    let analyze = sequencer.phase_result("analyze").unwrap();
    assert_eq!(analyze.rounds_used, 1);
    assert_eq!(analyze.tool_calls.len(), 1);
    assert_eq!(analyze.output, "Searched it. PHASE_COMPLETE");
    assert_eq!(provider.call_count(), 2);
    assert_eq!(
        provider.requests()[1].user_prompt,
        "# Previous Phase: analyze\n\n## Output\nSearched it. PHASE_COMPLETE"
    );
}

#[tokio::test]
async fn test_immediate_completion() {
    let provider = scripted(vec![InferenceResponse::text("All done.")]);
    let mut sequencer = sequencer(vec![Phase::new("analyze")], provider);

    sequencer.execute(&CancellationToken::new(), "go").await.unwrap();

    let result = sequencer.phase_result("analyze").unwrap();
    assert!(result.success);
    assert_eq!(result.rounds_used, 1);
    assert_eq!(result.output, "All done.");
    assert!(result.tool_calls.is_empty());
}

#[tokio::test]
async fn test_tool_completion_marker() {
    let provider = scripted(vec![InferenceResponse::text("Opening the PR now.").with_tool_call("open_pr", json!({}))]);
    let mut sequencer = sequencer(vec![Phase::new("ship")], provider.clone());

    sequencer.execute(&CancellationToken::new(), "go").await.unwrap();

    let result = sequencer.phase_result("ship").unwrap();
    assert!(result.success);
    assert_eq!(result.rounds_used, 1);
    assert_eq!(result.output, "Opening the PR now.");
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_failed_tool_does_not_abort_phase() {
    let provider = scripted(vec![
        InferenceResponse::text("Reading.").with_tool_call("read", json!({})),
        InferenceResponse::text("Could not read it, PHASE_COMPLETE anyway"),
    ]);
    let mut sequencer = sequencer(vec![Phase::new("analyze")], provider.clone());

    sequencer.execute(&CancellationToken::new(), "go").await.unwrap();

    let result = sequencer.phase_result("analyze").unwrap();
    assert_eq!(result.tool_calls.len(), 1);
    assert!(!result.tool_calls[0].success);
    assert!(provider.requests()[1].user_prompt.contains("❌ read failed:"));
}

#[tokio::test]
async fn test_text_parsed_tool_calls() {
    let provider = scripted(vec![
        InferenceResponse::text("Checking.\n```json\n{\"tool\": \"read\", \"args\": {\"path\": \"Cargo.toml\"}}\n```"),
        InferenceResponse::text("PHASE_COMPLETE"),
    ]);
    let mut sequencer = sequencer(vec![Phase::new("analyze")], provider.clone());

    sequencer.execute(&CancellationToken::new(), "go").await.unwrap();

    let result = sequencer.phase_result("analyze").unwrap();
    assert_eq!(result.tool_calls.len(), 1);
    assert_eq!(result.tool_calls[0].output, "contents of Cargo.toml");
}

#[tokio::test]
async fn test_chaining_uses_sanitized_output() {
    let provider = scripted(vec![
        InferenceResponse::text(
            "Found the leak.\n```rust\nlet leaked = Box::leak(buf);\n```\nsrc/pool.rs\n{\"tool\": \"read\", \"args\": {\"path\": \"x\"}} \nPHASE_COMPLETE",
        ),
        InferenceResponse::text("PHASE_COMPLETE"),
    ]);
    let mut sequencer = sequencer(vec![Phase::new("analyze"), Phase::new("implement")], provider.clone());

    sequencer.execute(&CancellationToken::new(), "go").await.unwrap();

    let next_input = &provider.requests()[1].user_prompt;
    assert_eq!(
        next_input,
        "# Previous Phase: analyze\n\n## Output\nFound the leak.\nPHASE_COMPLETE"
    );
    assert!(sequencer.phase_result("analyze").unwrap().output.contains("Box::leak"));
}

#[tokio::test]
async fn test_cancellation_aborts_in_flight_call() {
    let provider = Arc::new(
        ScriptedProvider::from_responses(vec![InferenceResponse::text("PHASE_COMPLETE")])
            .with_delay(Duration::from_secs(30)),
    );
    let mut sequencer = sequencer(vec![Phase::new("analyze"), Phase::new("plan")], provider);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = tokio::time::timeout(Duration::from_secs(5), sequencer.execute(&cancel, "go"))
        .await
        .expect("cancellation should end the run promptly")
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(err.phase_name(), Some("analyze"));
    let result = sequencer.phase_result("analyze").unwrap();
    assert!(!result.success);
    assert_eq!(result.rounds_used, 1);
    assert!(sequencer.phase_result("plan").is_none());
}
