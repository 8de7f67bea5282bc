//! Job Models
//!
//! A job is one asynchronous run of a phase sequence. Its conversation log
//! records every prompt, response, tool call, and tool result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Job lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, sequencer not started yet
    Pending,
    /// Sequencer is running
    Running,
    /// All phases completed
    Completed,
    /// A phase failed, the sequence was stopped, or the job was cancelled
    Failed,
}

impl JobStatus {
    /// Check if this status is final
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Check if a move to `next` is allowed
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Pending, JobStatus::Failed)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(format!("Unknown job status: {}", s)),
        }
    }
}

/// A job record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    /// Workflow name the job runs
    pub workflow_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a new pending job with a fresh id
    pub fn new(workflow_type: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            workflow_type: workflow_type.into(),
            description: description.into(),
            status: JobStatus::Pending,
            output: None,
            error: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    /// Apply a status change, stamping start/completion times.
    ///
    /// Returns `false` (leaving the job untouched) for a disallowed
    /// transition.
    pub fn apply_status(&mut self, status: JobStatus, output: Option<Value>, error: Option<String>) -> bool {
        if !self.status.can_transition_to(status) {
            return false;
        }
        let now = Utc::now();
        self.status = status;
        self.updated_at = now;
        if status == JobStatus::Running {
            self.started_at = Some(now);
        }
        if status.is_terminal() {
            self.completed_at = Some(now);
        }
        if output.is_some() {
            self.output = output;
        }
        if error.is_some() {
            self.error = error;
        }
        true
    }
}

/// Who produced a conversation entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationRole {
    User,
    Assistant,
    System,
    ToolCall,
    ToolResult,
}

impl std::fmt::Display for ConversationRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversationRole::User => write!(f, "user"),
            ConversationRole::Assistant => write!(f, "assistant"),
            ConversationRole::System => write!(f, "system"),
            ConversationRole::ToolCall => write!(f, "tool_call"),
            ConversationRole::ToolResult => write!(f, "tool_result"),
        }
    }
}

impl std::str::FromStr for ConversationRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(ConversationRole::User),
            "assistant" => Ok(ConversationRole::Assistant),
            "system" => Ok(ConversationRole::System),
            "tool_call" => Ok(ConversationRole::ToolCall),
            "tool_result" => Ok(ConversationRole::ToolResult),
            _ => Err(format!("Unknown conversation role: {}", s)),
        }
    }
}

/// One entry in a job's conversation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub role: ConversationRole,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    pub timestamp: DateTime<Utc>,
}

impl ConversationEntry {
    fn with_content(role: ConversationRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool: None,
            args: None,
            result: None,
            success: None,
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_content(ConversationRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_content(ConversationRole::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_content(ConversationRole::System, content)
    }

    /// A requested tool invocation
    pub fn tool_call(tool: impl Into<String>, args: Value) -> Self {
        let mut entry = Self::with_content(ConversationRole::ToolCall, "");
        entry.tool = Some(tool.into());
        entry.args = Some(args);
        entry
    }

    /// The outcome of a tool invocation
    pub fn tool_result(tool: impl Into<String>, result: Value, success: bool) -> Self {
        let mut entry = Self::with_content(ConversationRole::ToolResult, "");
        entry.tool = Some(tool.into());
        entry.result = Some(result);
        entry.success = Some(success);
        entry
    }
}
