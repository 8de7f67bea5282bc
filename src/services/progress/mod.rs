//! Progress Tracking
//!
//! Per-phase status store for a running job, with tree and stream renderings.

pub mod render;
pub mod sink;
pub mod tracker;

pub use render::{format_token_count, render_stream_event, render_tree};
pub use sink::{ChannelSink, ProgressSink, RenderMode, WriterSink};
pub use tracker::{ProgressSnapshot, ProgressTracker};
