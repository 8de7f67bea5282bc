//! Progress Tracker
//!
//! Concurrency-safe per-phase status and statistics for one job. Every
//! mutation publishes an immutable snapshot on a watch channel and pushes a
//! fresh rendering to each registered sink while the lock is held.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

use crate::models::progress::{PhaseProgress, PhaseStatus};
use crate::services::progress::render::{render_stream_event, render_tree};
use crate::services::progress::sink::{ProgressSink, RenderMode};

/// Immutable view of every phase, in insertion order
pub type ProgressSnapshot = Arc<Vec<PhaseProgress>>;

#[derive(Default)]
struct TrackerState {
    phases: Vec<PhaseProgress>,
    index: HashMap<String, usize>,
    sinks: Vec<Arc<dyn ProgressSink>>,
}

impl TrackerState {
    fn get_mut(&mut self, name: &str) -> Option<&mut PhaseProgress> {
        let idx = *self.index.get(name)?;
        self.phases.get_mut(idx)
    }

    fn insert(&mut self, progress: PhaseProgress) {
        self.index.insert(progress.name.clone(), self.phases.len());
        self.phases.push(progress);
    }
}

pub struct ProgressTracker {
    state: Mutex<TrackerState>,
    snapshots: watch::Sender<ProgressSnapshot>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (snapshots, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            state: Mutex::new(TrackerState::default()),
            snapshots,
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Publish the current state. Must be called with the lock held.
    fn broadcast(&self, state: &TrackerState) {
        self.snapshots.send_replace(Arc::new(state.phases.clone()));

        if state.sinks.is_empty() {
            return;
        }
        let mut tree: Option<String> = None;
        let mut stream: Option<String> = None;
        for sink in &state.sinks {
            let rendered = match sink.render_mode() {
                RenderMode::Tree => tree.get_or_insert_with(|| render_tree(&state.phases)),
                RenderMode::Stream => stream.get_or_insert_with(|| render_stream_event(&state.phases)),
            };
            sink.publish(rendered);
        }
    }

    /// Register a phase as pending. Existing phases are left untouched.
    pub fn add_phase(&self, name: &str) {
        let mut state = self.lock();
        if state.index.contains_key(name) {
            return;
        }
        state.insert(PhaseProgress::new(name));
        self.broadcast(&state);
    }

    /// Set status and progress note, adding the phase if it is unknown
    pub fn update_phase(&self, name: &str, status: PhaseStatus, progress: impl Into<String>) {
        let progress = progress.into();
        let mut state = self.lock();
        match state.get_mut(name) {
            Some(phase) => {
                phase.status = status;
                phase.progress = progress;
            }
            None => {
                let mut phase = PhaseProgress::new(name);
                phase.status = status;
                phase.progress = progress;
                state.insert(phase);
            }
        }
        self.broadcast(&state);
    }

    /// Record an error and mark the phase failed
    pub fn set_phase_error(&self, name: &str, error: impl Into<String>) {
        let mut state = self.lock();
        let Some(phase) = state.get_mut(name) else {
            return;
        };
        phase.status = PhaseStatus::Failed;
        phase.error = Some(error.into());
        self.broadcast(&state);
    }

    pub fn increment_tool_use(&self, name: &str) {
        let mut state = self.lock();
        let Some(phase) = state.get_mut(name) else {
            return;
        };
        phase.tool_uses += 1;
        self.broadcast(&state);
    }

    pub fn add_tokens(&self, name: &str, tokens: u64) {
        let mut state = self.lock();
        let Some(phase) = state.get_mut(name) else {
            return;
        };
        phase.token_count += tokens;
        self.broadcast(&state);
    }

    /// All phases in insertion order
    pub fn phases(&self) -> Vec<PhaseProgress> {
        self.lock().phases.clone()
    }

    pub fn phase(&self, name: &str) -> Option<PhaseProgress> {
        let state = self.lock();
        state.index.get(name).and_then(|&i| state.phases.get(i)).cloned()
    }

    /// Subscribe to snapshots; the receiver starts at the current state
    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn add_sink(&self, sink: Arc<dyn ProgressSink>) {
        self.lock().sinks.push(sink);
    }

    /// Current tree rendering
    pub fn render_tree(&self) -> String {
        render_tree(&self.lock().phases)
    }

    /// Drop every phase; sinks stay registered
    pub fn reset(&self) {
        let mut state = self.lock();
        state.phases.clear();
        state.index.clear();
        self.broadcast(&state);
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("phases", &self.phases())
            .finish()
    }
}
