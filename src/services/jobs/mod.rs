//! Jobs
//!
//! Background execution of phase sequences with persisted lifecycle.

pub mod runner;

pub use runner::{JobHandle, JobOutcome, JobRunner};
