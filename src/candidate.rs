//! Eligibility checks for watch-directory entries.
//!
//! An entry younger than the minimum age is skipped so that files still being
//! written by a browser or another process are picked up on a later pass.
//! Entries that vanish between listing and stat are treated as non-candidates.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Filtering policy shared by the file and directory checks.
#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    min_age: Duration,
    ignored_suffixes: Vec<String>,
    ignored_names: Vec<String>,
}

impl CandidateFilter {
    /// Creates a filter. Suffixes are compared case-insensitively against the
    /// whole file name; names must match exactly.
    pub fn new(min_age_sec: u64, ignored_suffixes: &[String], ignored_names: &[String]) -> Self {
        Self {
            min_age: Duration::from_secs(min_age_sec),
            ignored_suffixes: ignored_suffixes.iter().map(|s| s.to_lowercase()).collect(),
            ignored_names: ignored_names.to_vec(),
        }
    }

    /// True if `name` is listed in the ignored names.
    pub fn is_ignored_name(&self, name: &str) -> bool {
        self.ignored_names.iter().any(|ignored| ignored == name)
    }

    /// True if `name` ends with any ignored suffix, ignoring case.
    pub fn has_ignored_suffix(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.ignored_suffixes
            .iter()
            .any(|suffix| lower.ends_with(suffix.as_str()))
    }

    /// Whether `path` is a regular file old enough to organize.
    pub fn is_candidate_file(&self, path: &Path, now: SystemTime) -> bool {
        let Ok(metadata) = fs::metadata(path) else {
            return false;
        };
        if !metadata.is_file() {
            return false;
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        if self.is_ignored_name(&name) || self.has_ignored_suffix(&name) {
            return false;
        }

        metadata
            .modified()
            .is_ok_and(|modified| self.is_old_enough(modified, now))
    }

    /// Whether `path` is a directory old enough to collect.
    pub fn is_candidate_dir(&self, path: &Path, now: SystemTime) -> bool {
        let Ok(metadata) = fs::metadata(path) else {
            return false;
        };
        metadata.is_dir()
            && metadata
                .modified()
                .is_ok_and(|modified| self.is_old_enough(modified, now))
    }

    /// Age at exactly the threshold counts as old enough. A modification time
    /// in the future never does.
    fn is_old_enough(&self, modified: SystemTime, now: SystemTime) -> bool {
        now.duration_since(modified)
            .is_ok_and(|age| age >= self.min_age)
    }
}
