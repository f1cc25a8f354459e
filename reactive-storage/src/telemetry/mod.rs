//! Structured telemetry: a JSON-lines event log plus a periodically
//! rewritten aggregate snapshot (spec §9). Both are advisory — a
//! telemetry write failure is logged via `tracing` and swallowed rather
//! than propagated, since an operator's disk-full shouldn't fail a
//! caller's read or write.

mod event;
mod snapshot;

pub use event::{Event, Outcome};
pub use snapshot::{Snapshot, SnapshotStore};

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Appends one JSON line per event to a log file. Construction never
/// fails: if the path can't be opened, every subsequent `record` call
/// is a no-op (logged once at construction time).
pub struct TelemetryLog {
    path: Option<PathBuf>,
    writer: Mutex<Option<std::fs::File>>,
}

impl TelemetryLog {
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => Self {
                path: Some(path),
                writer: Mutex::new(Some(file)),
            },
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to open telemetry log; telemetry disabled");
                Self {
                    path: None,
                    writer: Mutex::new(None),
                }
            }
        }
    }

    pub fn disabled() -> Self {
        Self {
            path: None,
            writer: Mutex::new(None),
        }
    }

    pub fn record(&self, event: &Event) {
        let Ok(mut guard) = self.writer.lock() else {
            return;
        };
        let Some(file) = guard.as_mut() else {
            return;
        };
        let line = match event.to_json_line() {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize telemetry event");
                return;
            }
        };
        if let Err(err) = writeln!(file, "{line}") {
            tracing::warn!(path = ?self.path, error = %err, "failed to append telemetry event");
        }
    }
}
