//! Trace sinks: observers of bias computation and edge removal.
//!
//! The graph holds one `Arc<dyn TraceSink>` injected at construction.
//! Algorithms never branch on the sink; the default [`NoopSink`] swallows
//! everything.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::Result;

/// A single trace record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceEvent {
    /// Descending into a user's bias computation.
    EnterBias(String),
    /// Finished computing a user's bias.
    ExitBias(String),
    /// The follow edge `follower -> followee` was removed from the scratch adjacency.
    EdgeRemoved { followee: String, follower: String },
}

impl std::fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraceEvent::EnterBias(name) => write!(f, "=> {name}"),
            TraceEvent::ExitBias(name) => write!(f, "<= {name}"),
            TraceEvent::EdgeRemoved { followee, follower } => {
                write!(f, "Removing connection: {follower} -> {followee}")
            }
        }
    }
}

/// Receives trace events. Implementations must not fail the caller.
pub trait TraceSink: Send + Sync {
    fn record(&self, event: TraceEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl TraceSink for NoopSink {
    fn record(&self, _event: TraceEvent) {}
}

/// Keeps events in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<TraceEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().clone()
    }

    pub fn removed_edges(&self) -> Vec<(String, String)> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                TraceEvent::EdgeRemoved { followee, follower } => {
                    Some((followee.clone(), follower.clone()))
                }
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl TraceSink for RecordingSink {
    fn record(&self, event: TraceEvent) {
        self.events.lock().push(event);
    }
}

/// Append-only text log, one event per line.
///
/// The first write failure is reported through `tracing`; every later event
/// is dropped and the analysis carries on.
pub struct FileTraceSink {
    writer: Mutex<BufWriter<File>>,
    failed: AtomicBool,
}

impl FileTraceSink {
    /// Truncates `path`, like the report files.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::from_file(file))
    }

    /// Appends to `path`, creating it if needed.
    pub fn append(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::from_file(file))
    }

    fn from_file(file: File) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(file)),
            failed: AtomicBool::new(false),
        }
    }

    /// True once a write has failed and events are being dropped.
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn flush(&self) -> Result<()> {
        self.writer.lock().flush()?;
        Ok(())
    }
}

impl TraceSink for FileTraceSink {
    fn record(&self, event: TraceEvent) {
        if self.has_failed() {
            return;
        }
        if let Err(err) = writeln!(self.writer.lock(), "{event}") {
            if !self.failed.swap(true, Ordering::Relaxed) {
                tracing::warn!(error = %err, "trace log write failed; further events dropped");
            }
        }
    }
}

impl Drop for FileTraceSink {
    fn drop(&mut self) {
        let _ = self.writer.get_mut().flush();
    }
}

/// Forwards events to `tracing` at TRACE level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn record(&self, event: TraceEvent) {
        match &event {
            TraceEvent::EnterBias(name) => tracing::trace!(user = %name, "enter bias"),
            TraceEvent::ExitBias(name) => tracing::trace!(user = %name, "exit bias"),
            TraceEvent::EdgeRemoved { followee, follower } => {
                tracing::trace!(%followee, %follower, "edge removed")
            }
        }
    }
}
