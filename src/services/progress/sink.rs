//! Progress Sinks
//!
//! Destinations for tracker updates. Each sink picks a rendering and
//! receives one synchronous write per tracker mutation.

use std::io::Write;
use std::sync::Mutex;

use tokio::sync::mpsc;

/// Which rendering a sink receives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Tree view for terminals
    Tree,
    /// `event: progress` frames
    Stream,
}

/// Receiver of rendered progress updates.
///
/// Called while the tracker lock is held; implementations must not call
/// back into the tracker.
pub trait ProgressSink: Send + Sync {
    fn render_mode(&self) -> RenderMode {
        RenderMode::Tree
    }

    fn publish(&self, rendered: &str);
}

/// Writes every update to an `io::Write`
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
    mode: RenderMode,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W, mode: RenderMode) -> Self {
        Self {
            writer: Mutex::new(writer),
            mode,
        }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl<W: Write + Send> ProgressSink for WriterSink<W> {
    fn render_mode(&self) -> RenderMode {
        self.mode
    }

    fn publish(&self, rendered: &str) {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = writer.write_all(rendered.as_bytes()).and_then(|_| writer.flush()) {
            tracing::warn!("[ProgressSink] Failed to write progress update: {}", e);
        }
    }
}

/// Forwards every update over an unbounded channel
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
    mode: RenderMode,
}

impl ChannelSink {
    /// Create a sink and the receiver it feeds
    pub fn new(mode: RenderMode) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, mode }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn render_mode(&self) -> RenderMode {
        self.mode
    }

    fn publish(&self, rendered: &str) {
        // A dropped receiver just means nobody is listening any more.
        let _ = self.tx.send(rendered.to_string());
    }
}
