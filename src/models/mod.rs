//! Data Models
//!
//! Contains all data structures used throughout the engine.

pub mod job;
pub mod phase;
pub mod progress;
pub mod settings;
pub mod workflow;

pub use job::*;
pub use phase::*;
pub use progress::*;
pub use settings::*;
pub use workflow::*;
