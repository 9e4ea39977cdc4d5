//! A single organizing pass over the watch directory.
//!
//! The pass lists the watch directory once, in sorted order, then:
//! 1. moves every candidate file that matches a rule into the rule's
//!    destination (renamed by the rule's template) and marks that
//!    destination as managed;
//! 2. if enabled, moves unmanaged subfolders into the archive root.
//!
//! A failing entry is logged and recorded in the [`PassReport`]; the rest of
//! the pass carries on. In dry-run mode nothing on disk changes but the
//! report counts exactly what a real pass would act upon.

use crate::candidate::CandidateFilter;
use crate::collector::{UnmanagedCollector, resolve_path};
use crate::config::{ConfigError, OrganizerConfig};
use crate::marker::{self, MarkOutcome};
use crate::mover::{MoveError, SafeMover};
use crate::rules::{CompiledRule, RuleSet};
use crate::template::{self, FileAttrs, TemplateError};
use chrono::{DateTime, Local};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, error, info, info_span};

/// Errors raised while organizing.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The watch directory template cannot be expanded.
    #[error("Cannot resolve watch directory '{template}': {error}")]
    WatchDir {
        template: String,
        #[source]
        error: TemplateError,
    },

    /// The watch directory exists but cannot be listed.
    #[error("Failed to list {}: {error}", path.display())]
    ListFailed {
        path: PathBuf,
        #[source]
        error: io::Error,
    },

    /// A matching rule has no `to_dir`.
    #[error("Rule '{rule}' has no destination directory")]
    MissingDestination { rule: String },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Move(#[from] MoveError),
}

pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// An entry that could not be handled during a pass.
#[derive(Debug, Clone)]
pub struct EntryFailure {
    pub entry: PathBuf,
    /// The rule that matched, for files.
    pub rule: Option<String>,
    pub error: String,
}

/// What a pass did, or in dry-run mode, would have done.
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    pub dry_run: bool,
    pub files_moved: usize,
    pub dirs_moved: usize,
    pub failures: Vec<EntryFailure>,
}

impl PassReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Default::default()
        }
    }

    /// Number of entries acted upon.
    pub fn processed(&self) -> usize {
        self.files_moved + self.dirs_moved
    }
}

/// Runs organizing passes for one configuration.
#[derive(Debug, Clone)]
pub struct Organizer {
    config: OrganizerConfig,
    rules: RuleSet,
    filter: CandidateFilter,
}

impl Organizer {
    /// Compiles the configuration's rules and filters.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidGlobPattern` if a rule's glob is invalid.
    pub fn new(config: OrganizerConfig) -> Result<Self, ConfigError> {
        let rules = config.compile_rules()?;
        let filter = CandidateFilter::new(config.min_age_sec, &config.ignore_ext, &config.ignore_names);
        Ok(Self {
            config,
            rules,
            filter,
        })
    }

    pub fn config(&self) -> &OrganizerConfig {
        &self.config
    }

    /// Runs one pass using the current time.
    ///
    /// # Arguments
    ///
    /// * `dry_run` - When true, nothing on disk changes; the report still
    ///   counts every entry a real pass would move
    ///
    /// # Returns
    ///
    /// A [`PassReport`] with the files and folders moved and the entries that
    /// failed, or an `OrganizeError` when the pass could not run at all.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dorg::config::{OrganizerConfig, RuleConfig};
    /// use dorg::organizer::Organizer;
    ///
    /// let mut config = OrganizerConfig::new("~/Downloads");
    /// config.rules.push(RuleConfig {
    ///     name: "PDFs".to_string(),
    ///     match_ext: vec!["pdf".to_string()],
    ///     to_dir: Some("~/Documents/PDF/{YYYY}".to_string()),
    ///     ..Default::default()
    /// });
    ///
    /// let organizer = Organizer::new(config)?;
    /// let report = organizer.run_pass(true)?;
    /// println!("{} entries would move", report.processed());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn run_pass(&self, dry_run: bool) -> OrganizeResult<PassReport> {
        self.run_pass_at(Local::now(), dry_run)
    }

    /// Runs one pass as if the current time were `now`.
    ///
    /// A missing watch directory is logged and yields an empty report.
    ///
    /// # Errors
    ///
    /// Only pass-level problems are errors: an unexpandable watch directory
    /// template or a watch directory that cannot be listed. Per-entry failures
    /// are recorded in the report.
    pub fn run_pass_at(&self, now: DateTime<Local>, dry_run: bool) -> OrganizeResult<PassReport> {
        let _span = info_span!("pass", dry_run).entered();
        let mut report = PassReport::new(dry_run);

        let watch_dir = template::expand_dir(&self.config.watch_dir, &now).map_err(|error| {
            OrganizeError::WatchDir {
                template: self.config.watch_dir.clone(),
                error,
            }
        })?;
        let watch_dir = resolve_path(&watch_dir);
        if !watch_dir.is_dir() {
            error!(watch_dir = %watch_dir.display(), "watch directory not found");
            return Ok(report);
        }

        let entries = list_sorted(&watch_dir)?;
        let clock = SystemTime::from(now);

        for path in &entries {
            if !self.filter.is_candidate_file(path, clock) {
                continue;
            }
            let Some(rule) = self.rules.find_match(path) else {
                continue;
            };

            match self.organize_file(path, rule, &now, &watch_dir, dry_run) {
                Ok(()) => report.files_moved += 1,
                Err(e) => {
                    error!(
                        file = %display_name(path),
                        rule = %rule.name(),
                        error = %e,
                        "failed to organize file"
                    );
                    report.failures.push(EntryFailure {
                        entry: path.clone(),
                        rule: Some(rule.name().to_string()),
                        error: e.to_string(),
                    });
                }
            }
        }

        if self.config.collect_unmanaged_dirs {
            match UnmanagedCollector::prepare(&self.config, &now, &watch_dir) {
                Ok(collector) => collector.collect(&entries, &self.filter, clock, &mut report),
                Err(e) => error!(error = %e, "cannot resolve unmanaged folder target, skipping folders"),
            }
        }

        Ok(report)
    }

    fn organize_file(
        &self,
        path: &Path,
        rule: &CompiledRule,
        now: &DateTime<Local>,
        watch_dir: &Path,
        dry_run: bool,
    ) -> OrganizeResult<()> {
        let to_dir = rule
            .config()
            .destination_template()
            .ok_or_else(|| OrganizeError::MissingDestination {
                rule: rule.name().to_string(),
            })?;
        let dest_dir = template::expand_dir_under(to_dir, now, watch_dir)?;
        let name = template::expand_file_name(
            rule.config().rename_template(),
            &FileAttrs::from_path(path),
            now,
            0,
        );

        if dry_run {
            info!(
                "[DRY] FILE {} -> {}/{} ({})",
                display_name(path),
                dest_dir.display(),
                name,
                rule.name()
            );
            return Ok(());
        }

        let target = SafeMover::move_file(path, &dest_dir, &name, rule.config().ensure_unique)?;

        // Best effort: an unmarked destination only loses its sweep protection.
        if let MarkOutcome::Failed(e) = marker::mark(&dest_dir, &self.config.managed_marker) {
            debug!(dir = %dest_dir.display(), error = %e, "could not mark directory as managed");
        }

        info!(
            file = %display_name(path),
            dest = %target.display(),
            rule = %rule.name(),
            "moved file"
        );
        Ok(())
    }
}

fn list_sorted(dir: &Path) -> OrganizeResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|error| OrganizeError::ListFailed {
        path: dir.to_path_buf(),
        error,
    })?;

    let mut paths: Vec<PathBuf> = entries.flatten().map(|entry| entry.path()).collect();
    paths.sort();
    Ok(paths)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
