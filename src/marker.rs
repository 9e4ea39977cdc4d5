//! Sentinel files marking directories the organizer moved files into.
//!
//! The marker's presence is the only signal; it has no content. Markers are
//! never removed and directories are never marked retroactively.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;

/// Result of a best-effort [`mark`] call.
#[derive(Debug)]
pub enum MarkOutcome {
    Created,
    AlreadyPresent,
    Failed(io::Error),
}

impl MarkOutcome {
    pub fn is_marked(&self) -> bool {
        !matches!(self, MarkOutcome::Failed(_))
    }
}

/// Creates the zero-byte marker in `dir` unless it already exists.
///
/// Failure is reported in the outcome rather than as an error: callers treat
/// marking as best effort.
pub fn mark(dir: &Path, marker_name: &str) -> MarkOutcome {
    let marker = dir.join(marker_name);
    match OpenOptions::new().write(true).create_new(true).open(&marker) {
        Ok(_) => MarkOutcome::Created,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => MarkOutcome::AlreadyPresent,
        Err(e) => MarkOutcome::Failed(e),
    }
}

/// Whether `dir` carries the marker.
pub fn is_managed(dir: &Path, marker_name: &str) -> bool {
    dir.join(marker_name).exists()
}
