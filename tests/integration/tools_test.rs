//! Tool Integration Tests
//!
//! Tool calls flowing through whole phases:
//! - Recalling the full plan after the planning digest
//! - Tool-call block convention for text-only backends
//! - Disabled text parsing

use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use phasewright::models::phase::Phase;
use phasewright::{EngineConfig, InferenceResponse, PhaseContext, PhaseSequencer, RecallTool, ScriptedProvider, ToolRegistry};
use phasewright_llm::TextActionFormat;

fn recall_registry() -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(RecallTool::new()));
    Arc::new(registry)
}

fn sequencer(phases: Vec<Phase>, provider: Arc<ScriptedProvider>) -> PhaseSequencer {
    PhaseSequencer::new(
        phases,
        provider,
        recall_registry(),
        EngineConfig::default(),
        PhaseContext::new("job-tools", "."),
    )
}

#[tokio::test]
async fn test_implement_phase_recalls_full_plan() {
    let provider = Arc::new(ScriptedProvider::from_responses(vec![
        InferenceResponse::text(r#"{"title": "Shard the index", "steps": ["split", "route"]} PHASE_COMPLETE"#),
        InferenceResponse::text("Reading the plan first.")
            .with_tool_call("context", json!({"action": "recall", "key": "implementation_plan"})),
        InferenceResponse::text("Plan applied. PHASE_COMPLETE"),
    ]));
    let mut sequencer = sequencer(
        vec![Phase::new("plan").expecting_json(), Phase::new("implement")],
        provider.clone(),
    );

    sequencer.execute(&CancellationToken::new(), "go").await.unwrap();

    let requests = provider.requests();
    assert!(requests[1]
        .user_prompt
        .contains("Use the `context` tool with action `recall` and key `implementation_plan`"));

    let implement = sequencer.phase_result("implement").unwrap();
    assert_eq!(implement.tool_calls.len(), 1);
    assert!(implement.tool_calls[0].success);
    assert!(implement.tool_calls[0].output.contains("\"Shard the index\""));
    assert!(requests[2].user_prompt.contains("route"));
}

#[tokio::test]
async fn test_tool_call_block_convention() {
    let provider = Arc::new(
        ScriptedProvider::from_responses(vec![
            InferenceResponse::text(
                "Checking stored keys.\n```tool_call\n{\"tool\": \"context\", \"arguments\": {\"action\": \"list\"}}\n```",
            ),
            InferenceResponse::text("Nothing stored yet. PHASE_COMPLETE"),
        ])
        .with_text_action_format(TextActionFormat::ToolCallBlock),
    );
    let mut sequencer = sequencer(vec![Phase::new("analyze")], provider.clone());

    sequencer.execute(&CancellationToken::new(), "go").await.unwrap();

    let result = sequencer.phase_result("analyze").unwrap();
    assert_eq!(result.tool_calls.len(), 1);
    assert_eq!(result.tool_calls[0].tool_name, "context");
    assert!(provider.requests()[1].user_prompt.contains("✅ context: No stored entries."));
}

#[tokio::test]
async fn test_disabled_text_parsing_treats_json_as_prose() {
    let provider = Arc::new(
        ScriptedProvider::from_responses(vec![
            InferenceResponse::text(r#"{"tool": "context", "args": {"action": "list"}}"#),
            InferenceResponse::text("PHASE_COMPLETE"),
        ])
        .with_text_action_format(TextActionFormat::None),
    );
    let mut sequencer = sequencer(vec![Phase::new("analyze")], provider.clone());

    sequencer.execute(&CancellationToken::new(), "go").await.unwrap();

    let result = sequencer.phase_result("analyze").unwrap();
    assert!(result.tool_calls.is_empty());
    assert_eq!(result.rounds_used, 2);
    assert!(provider.requests()[1].user_prompt.starts_with("Please continue with the current phase."));
}
