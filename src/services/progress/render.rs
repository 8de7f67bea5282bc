//! Progress Rendering
//!
//! Text renderings of tracker snapshots: an indented tree for terminals and
//! server-sent-event frames for streaming clients.

use serde_json::json;

use crate::models::progress::{PhaseProgress, PhaseStatus};

/// Format a token count, switching to `1.2k` form at one thousand
pub fn format_token_count(tokens: u64) -> String {
    if tokens >= 1000 {
        format!("{:.1}k", tokens as f64 / 1000.0)
    } else {
        tokens.to_string()
    }
}

/// Render phases as a tree, one branch per phase
pub fn render_tree(phases: &[PhaseProgress]) -> String {
    let mut output = String::new();

    for (i, phase) in phases.iter().enumerate() {
        let is_last = i + 1 == phases.len();
        let prefix = if is_last { "└─ " } else { "├─ " };

        output.push_str(&format!("{}{} {}", prefix, phase.status.icon(), phase.name));

        if phase.tool_uses > 0 || phase.token_count > 0 {
            output.push_str(&format!(
                " . {} tool uses . {} tokens",
                phase.tool_uses,
                format_token_count(phase.token_count)
            ));
        }

        if !phase.progress.is_empty() {
            output.push_str(&format!(" ({})", phase.progress));
        }

        if phase.status == PhaseStatus::Failed {
            if let Some(error) = phase.error.as_deref().filter(|e| !e.is_empty()) {
                output.push_str(&format!("\n   Error: {}", error));
            }
        }

        output.push('\n');

        if !is_last {
            output.push_str(&format!("│  └─ {}\n", phase.status.label()));
        }
    }

    output
}

/// Render phases as one `event: progress` frame
pub fn render_stream_event(phases: &[PhaseProgress]) -> String {
    let data = json!({ "phases": phases });
    format!("event: progress\ndata: {}\n\n", data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase(name: &str, status: PhaseStatus) -> PhaseProgress {
        PhaseProgress {
            status,
            ..PhaseProgress::new(name)
        }
    }

    #[test]
    fn test_format_token_count() {
        assert_eq!(format_token_count(0), "0");
        assert_eq!(format_token_count(999), "999");
        assert_eq!(format_token_count(1000), "1.0k");
        assert_eq!(format_token_count(1234), "1.2k");
        assert_eq!(format_token_count(15_960), "16.0k");
    }

    #[test]
    fn test_render_tree() {
        let mut plan = phase("plan", PhaseStatus::Done);
        plan.tool_uses = 2;
        plan.token_count = 1500;
        let mut implement = phase("implement", PhaseStatus::InProgress);
        implement.progress = "round 3/10".to_string();
        let review = phase("review", PhaseStatus::Pending);

        let tree = render_tree(&[plan, implement, review]);
        assert_eq!(
            tree,
            "├─ ✓ plan . 2 tool uses . 1.5k tokens\n\
             │  └─ Done\n\
             ├─ ▶ implement (round 3/10)\n\
             │  └─ In Progress\n\
             └─ ⏳ review\n"
        );
    }

    #[test]
    fn test_render_tree_failed_phase() {
        let mut failed = phase("implement", PhaseStatus::Failed);
        failed.error = Some("max rounds (3) reached without completion".to_string());
        let tree = render_tree(&[failed]);
        assert_eq!(
            tree,
            "└─ ✗ implement\n   Error: max rounds (3) reached without completion\n"
        );
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_tree(&[]), "");
    }

    #[test]
    fn test_stream_event_frame() {
        let frame = render_stream_event(&[phase("plan", PhaseStatus::Done)]);
        assert!(frame.starts_with("event: progress\ndata: "));
        assert!(frame.ends_with("\n\n"));
        let data: serde_json::Value =
            serde_json::from_str(frame.trim_end().trim_start_matches("event: progress\ndata: ")).unwrap();
        assert_eq!(data["phases"][0]["status"], "done");
    }
}
