//! Services
//!
//! Engine logic: phase execution, progress tracking, and background jobs.

pub mod jobs;
pub mod phase;
pub mod progress;

pub use jobs::{JobHandle, JobOutcome, JobRunner};
pub use phase::{OutputSanitizer, PhaseRunner, PhaseSequencer};
pub use progress::{ProgressSink, ProgressTracker};
