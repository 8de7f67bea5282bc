//! Integration Tests Module
//!
//! End-to-end tests for the phase engine. Every model call is served by a
//! scripted transcript; tools are in-process closures.

// Shared registries and builders
mod support;

// Multi-phase runs, round budgets, completion and cancellation
mod sequencer_test;

// Background jobs and both job stores
mod job_test;

// Workflow files and engine config on disk
mod workflow_test;

// Recall tool and textual tool-call conventions
mod tools_test;
