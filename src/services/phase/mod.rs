//! Phase Execution
//!
//! The bounded round loop that drives a single phase, and the sequencer
//! that chains phases together.

pub mod completion;
pub mod extraction;
pub mod round_loop;
pub mod sanitizer;
pub mod sequencer;

pub use completion::CompletionDetector;
pub use extraction::{extract_actions, extract_json_object, RequestedAction};
pub use round_loop::PhaseRunner;
pub use sanitizer::{default_path_heuristic, OutputSanitizer, PathHeuristic};
pub use sequencer::{build_next_phase_input, PhaseSequencer};
