//! Archiving of stray subfolders of the watch directory.
//!
//! A subfolder is left alone when it is too young, ignored by name, hidden,
//! carries the managed marker, or is related (equal, ancestor or descendant)
//! to an excluded path. Excluded paths are the configured names, the top-level
//! folder of every rule destination inside the watch directory, and the
//! archive root itself. Everything else is moved into the archive root,
//! whose template is re-evaluated on every pass.

use crate::candidate::CandidateFilter;
use crate::config::OrganizerConfig;
use crate::marker;
use crate::mover::SafeMover;
use crate::organizer::{EntryFailure, PassReport};
use crate::template::{self, TemplateError};
use chrono::{DateTime, Local};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, error, info};

/// Makes `path` absolute and normalized, resolving symlinks in the part of it
/// that exists.
pub fn resolve_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    for ancestor in normalized.ancestors() {
        if let Ok(canonical) = fs::canonicalize(ancestor) {
            return match normalized.strip_prefix(ancestor) {
                Ok(rest) if !rest.as_os_str().is_empty() => canonical.join(rest),
                _ => canonical,
            };
        }
    }
    normalized
}

/// Resolves the archive root for the current timestamp.
pub fn resolve_archive_root(
    config: &OrganizerConfig,
    now: &DateTime<Local>,
    watch_dir: &Path,
) -> Result<PathBuf, TemplateError> {
    template::expand_dir_under(&config.unmanaged_dir_target, now, watch_dir)
        .map(|root| resolve_path(&root))
}

/// Paths whose relatives must never be collected this pass.
pub fn compute_exclusions(
    config: &OrganizerConfig,
    now: &DateTime<Local>,
    watch_dir: &Path,
) -> BTreeSet<PathBuf> {
    let watch_dir = resolve_path(watch_dir);
    let mut exclusions = BTreeSet::new();

    for name in &config.unmanaged_dirs_exclude {
        exclusions.insert(resolve_path(&watch_dir.join(name)));
    }

    for rule in &config.rules {
        let Some(to_dir) = rule.destination_template() else {
            continue;
        };
        let destination = match template::expand_dir_under(to_dir, now, &watch_dir) {
            Ok(destination) => resolve_path(&destination),
            Err(e) => {
                // The rule simply contributes no exclusion.
                debug!(rule = %rule.name, error = %e, "skipping unresolvable destination");
                continue;
            }
        };
        if let Ok(relative) = destination.strip_prefix(&watch_dir)
            && let Some(top) = relative.components().next()
        {
            exclusions.insert(resolve_path(&watch_dir.join(top)));
        }
    }

    match resolve_archive_root(config, now, &watch_dir) {
        Ok(root) => {
            exclusions.insert(root);
        }
        Err(e) => debug!(error = %e, "archive root not resolvable, not excluded"),
    }

    exclusions
}

/// True if `dir` equals, contains, or lies inside any excluded path.
pub fn is_excluded(dir: &Path, exclusions: &BTreeSet<PathBuf>) -> bool {
    let dir = resolve_path(dir);
    exclusions
        .iter()
        .any(|excluded| excluded.starts_with(&dir) || dir.starts_with(excluded))
}

/// One pass worth of unmanaged-folder collection.
#[derive(Debug, Clone)]
pub struct UnmanagedCollector {
    archive_root: PathBuf,
    exclusions: BTreeSet<PathBuf>,
    marker_name: String,
}

impl UnmanagedCollector {
    /// Evaluates the archive root and the exclusion set for this pass.
    ///
    /// # Errors
    ///
    /// Returns the template error when the archive root cannot be expanded;
    /// without it there is nowhere to collect into.
    pub fn prepare(
        config: &OrganizerConfig,
        now: &DateTime<Local>,
        watch_dir: &Path,
    ) -> Result<Self, TemplateError> {
        Ok(Self {
            archive_root: resolve_archive_root(config, now, watch_dir)?,
            exclusions: compute_exclusions(config, now, watch_dir),
            marker_name: config.managed_marker.clone(),
        })
    }

    pub fn archive_root(&self) -> &Path {
        &self.archive_root
    }

    pub fn exclusions(&self) -> &BTreeSet<PathBuf> {
        &self.exclusions
    }

    /// Whether `dir` should be moved into the archive root.
    pub fn should_collect(&self, dir: &Path, filter: &CandidateFilter, now: SystemTime) -> bool {
        if !filter.is_candidate_dir(dir, now) {
            return false;
        }

        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        if filter.is_ignored_name(&name) || name.starts_with('.') {
            return false;
        }

        !marker::is_managed(dir, &self.marker_name) && !is_excluded(dir, &self.exclusions)
    }

    /// Collects every eligible directory among `entries`, recording results in `report`.
    ///
    /// A folder that cannot be moved is logged and pushed to
    /// `report.failures`; the remaining folders are still collected.
    ///
    /// # Arguments
    ///
    /// * `entries` - Watch directory listing, in the order to process
    /// * `filter` - Age and ignore checks shared with the file phase
    /// * `now` - Clock used for the age check
    /// * `report` - Receives counts; its `dry_run` flag suppresses the moves
    pub fn collect(
        &self,
        entries: &[PathBuf],
        filter: &CandidateFilter,
        now: SystemTime,
        report: &mut PassReport,
    ) {
        for dir in entries {
            if !self.should_collect(dir, filter, now) {
                continue;
            }

            let name = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            if report.dry_run {
                info!("[DRY] DIR {} -> {}/", name, self.archive_root.display());
                report.dirs_moved += 1;
                continue;
            }

            match SafeMover::move_dir(dir, &self.archive_root, true) {
                Ok(target) => {
                    info!(dir = %name, dest = %target.display(), "collected unmanaged folder");
                    report.dirs_moved += 1;
                }
                Err(e) => {
                    error!(dir = %name, dest = %self.archive_root.display(), error = %e, "failed to collect folder");
                    report.failures.push(EntryFailure {
                        entry: dir.clone(),
                        rule: None,
                        error: e.to_string(),
                    });
                }
            }
        }
    }
}
