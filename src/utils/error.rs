//! Error Handling
//!
//! Engine-wide error type. Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use phasewright_core::CoreError;
use phasewright_llm::LlmError;

/// Engine error type
#[derive(Error, Debug)]
pub enum EngineError {
    /// Model/transport failure; fatal to the phase
    #[error("model call failed: {0}")]
    Llm(#[from] LlmError),

    /// Tool infrastructure or argument errors surfaced outside the round loop
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The round budget was exhausted without a completion signal
    #[error("max rounds ({0}) reached without completion")]
    MaxRounds(u32),

    /// Phase validator rejected the result, or invalid definitions/config
    #[error("validation failed: {0}")]
    Validation(String),

    /// The cancellation signal fired while a call was in flight
    #[error("execution cancelled")]
    Cancelled,

    /// A phase callback asked the sequence to stop
    #[error("execution stopped by caller after phase {0}")]
    Stopped(String),

    /// A phase callback failed
    #[error("phase callback error: {0}")]
    Callback(String),

    /// Job status transition out of a terminal state or backwards
    #[error("invalid job status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Wraps the error that stopped the sequence with the phase name
    #[error("phase {phase} failed: {source}")]
    Phase {
        phase: String,
        #[source]
        source: Box<EngineError>,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database errors
    #[error("Database error: {0}")]
    Database(String),

    /// SQLite errors (auto-converted from rusqlite::Error)
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for engine errors
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Wrap an error with the name of the phase it stopped
    pub fn in_phase(phase: impl Into<String>, source: EngineError) -> Self {
        Self::Phase {
            phase: phase.into(),
            source: Box::new(source),
        }
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Name of the phase this error was raised in, if wrapped
    pub fn phase_name(&self) -> Option<&str> {
        match self {
            Self::Phase { phase, .. } => Some(phase),
            _ => None,
        }
    }

    /// The innermost error, unwrapping phase wrappers
    pub fn root_cause(&self) -> &EngineError {
        match self {
            Self::Phase { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Whether the sequence ended because a callback asked it to stop
    pub fn is_stop(&self) -> bool {
        matches!(self.root_cause(), Self::Stopped(_))
    }

    /// Whether the sequence ended because of cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root_cause(), Self::Cancelled)
    }
}

impl From<EngineError> for String {
    fn from(err: EngineError) -> String {
        err.to_string()
    }
}
