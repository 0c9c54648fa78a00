//! Per-step observation and trace export.
//!
//! The engine reports every transition it takes to a [`TraceSink`] and also keeps the full
//! history in an [`ExecutionTrace`]. Export writes one snapshot per line with no headers.

use crate::tape::Snapshot;
use crate::types::{DtmError, State, Symbol};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// What the engine exposes about a single step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepEvent {
    /// Zero-based index of the step.
    pub step: usize,
    /// The state the step was taken from.
    pub state: State,
    /// The symbol that was under the head before the write.
    pub read: Symbol,
    /// The tape after the step.
    pub snapshot: Snapshot,
}

/// Consumer of step events.
pub trait TraceSink {
    /// Called once for every transition taken, after the tape has been updated.
    fn record(&mut self, event: &StepEvent);
}

impl<F> TraceSink for F
where
    F: FnMut(&StepEvent),
{
    fn record(&mut self, event: &StepEvent) {
        self(event)
    }
}

/// Prints each step as `<step>. <tape>` followed by the state it was taken from.
pub struct ConsoleSink<W: Write> {
    out: W,
}

impl ConsoleSink<io::Stdout> {
    /// Creates a sink that prints to standard output.
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> ConsoleSink<W> {
    /// Creates a sink that prints to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TraceSink for ConsoleSink<W> {
    fn record(&mut self, event: &StepEvent) {
        // Console output never aborts the run.
        if let Err(e) = writeln!(
            self.out,
            "{}. {}  [{} read {:?}, head {}]",
            event.step, event.snapshot, event.state, event.read, event.snapshot.head
        ) {
            tracing::warn!("failed to print step {}: {}", event.step, e);
        }
    }
}

/// The ordered history of tape snapshots of one run, one per transition taken.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionTrace {
    snapshots: Vec<Snapshot>,
}

impl ExecutionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, snapshot: Snapshot) {
        self.snapshots.push(snapshot);
    }

    pub(crate) fn clear(&mut self) {
        self.snapshots.clear();
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Returns the snapshot taken after step `index`.
    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Snapshot> {
        self.snapshots.iter()
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Writes every snapshot on its own line.
    pub fn export<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for snapshot in &self.snapshots {
            writeln!(out, "{}", snapshot)?;
        }

        out.flush()
    }

    /// Writes the trace to `path`, replacing any existing file.
    pub fn write_to_file(&self, path: &Path) -> Result<(), DtmError> {
        let file_error = |e: io::Error| {
            DtmError::FileError(format!("Failed to write trace to {}: {}", path.display(), e))
        };

        let mut out = BufWriter::new(File::create(path).map_err(file_error)?);
        self.export(&mut out).map_err(file_error)?;

        tracing::debug!(
            "exported {} snapshots to {}",
            self.snapshots.len(),
            path.display()
        );
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ExecutionTrace {
    type Item = &'a Snapshot;
    type IntoIter = std::slice::Iter<'a, Snapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.snapshots.iter()
    }
}
