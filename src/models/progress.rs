//! Progress Models
//!
//! Per-phase status and statistics published by the progress tracker.

use serde::{Deserialize, Serialize};

/// Display status of a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Pending,
    InProgress,
    Done,
    Failed,
}

impl PhaseStatus {
    /// Tree view icon
    pub fn icon(&self) -> &'static str {
        match self {
            PhaseStatus::Pending => "⏳",
            PhaseStatus::InProgress => "▶",
            PhaseStatus::Done => "✓",
            PhaseStatus::Failed => "✗",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            PhaseStatus::Pending => "Pending",
            PhaseStatus::InProgress => "In Progress",
            PhaseStatus::Done => "Done",
            PhaseStatus::Failed => "Failed",
        }
    }
}

/// Progress of one phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseProgress {
    pub name: String,
    pub status: PhaseStatus,
    pub tool_uses: u32,
    pub token_count: u64,
    /// Free-form note, e.g. "round 3/10"
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub progress: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PhaseProgress {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: PhaseStatus::Pending,
            tool_uses: 0,
            token_count: 0,
            progress: String::new(),
            error: None,
        }
    }
}
