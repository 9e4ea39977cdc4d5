//! Command-line interface for dorg.
//!
//! This module handles:
//! - Argument parsing (`--config`, `--once`, `--watch`, `--dry`)
//! - Locating the configuration beside the executable
//! - The one-shot and continuous-watch drivers

use crate::config::{ConfigError, OrganizerConfig};
use crate::organizer::{OrganizeError, Organizer};
use crate::output::OutputFormatter;
use clap::Parser;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

/// Sorts a watched folder by rules; optionally archives stray subfolders.
#[derive(Debug, Parser)]
#[command(name = "dorg", version, about)]
pub struct Cli {
    /// Configuration file (JSON with comments, or TOML), relative to the executable's directory.
    #[arg(long, default_value = "config.json")]
    pub config: PathBuf,

    /// Run a single pass and exit. Takes precedence over `--watch`.
    #[arg(long)]
    pub once: bool,

    /// Keep watching, running a pass every `interval_sec` seconds.
    #[arg(long)]
    pub watch: bool,

    /// Log what would happen without moving anything.
    #[arg(long)]
    pub dry: bool,
}

impl Cli {
    /// The command selected by the flags.
    ///
    /// `--once` wins over `--watch`. Without either, a single real pass runs
    /// and `--dry` is ignored.
    pub fn command(&self) -> OrganizeCommand {
        if self.once {
            OrganizeCommand::Once { dry_run: self.dry }
        } else if self.watch {
            OrganizeCommand::Watch { dry_run: self.dry }
        } else {
            OrganizeCommand::Once { dry_run: false }
        }
    }
}

/// Represents a CLI command to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizeCommand {
    /// Run one pass, then exit.
    Once { dry_run: bool },
    /// Run passes forever.
    Watch { dry_run: bool },
}

/// Errors that end the process with a non-zero status.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Organize(#[from] OrganizeError),
}

/// Directory containing the running executable, or the working directory
/// when that cannot be determined.
pub fn app_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Loads and compiles the configuration at `config_path`.
///
/// # Errors
///
/// Any configuration problem, including a missing file.
pub fn load_organizer(config_path: &Path) -> Result<Organizer, ConfigError> {
    let config = OrganizerConfig::load(config_path)?;
    Organizer::new(config)
}

/// Executes `command` with an already loaded organizer.
///
/// # Errors
///
/// In one-shot mode a pass-level failure (such as an unlistable watch
/// directory) is returned. Watch mode only returns if it is bounded.
pub fn run_cli(command: OrganizeCommand, organizer: &Organizer) -> Result<(), CliError> {
    match command {
        OrganizeCommand::Once { dry_run } => {
            let report = organizer.run_pass(dry_run)?;
            info!(processed = report.processed(), "done");
            OutputFormatter::pass_summary(&report);
            Ok(())
        }
        OrganizeCommand::Watch { dry_run } => {
            watch_loop(organizer, dry_run, None);
            Ok(())
        }
    }
}

/// Runs passes separated by the configured interval.
///
/// With `max_passes` of `None` this never returns. A failed pass is logged
/// and the loop carries on. Returns the total processed count.
pub fn watch_loop(organizer: &Organizer, dry_run: bool, max_passes: Option<usize>) -> usize {
    let interval = organizer.config().interval();
    info!(watch_dir = %organizer.config().watch_dir, "watching");

    let mut total = 0;
    let mut passes = 0;
    loop {
        match organizer.run_pass(dry_run) {
            Ok(report) => {
                if report.processed() > 0 {
                    info!(processed = report.processed(), "pass complete");
                }
                total += report.processed();
            }
            Err(e) => error!(error = %e, "pass failed"),
        }

        passes += 1;
        if max_passes.is_some_and(|max| passes >= max) {
            return total;
        }
        std::thread::sleep(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleConfig;
    use std::fs;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("dorg").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_default_is_single_real_pass() {
        let cli = parse(&[]);
        assert_eq!(cli.config, PathBuf::from("config.json"));
        assert_eq!(cli.command(), OrganizeCommand::Once { dry_run: false });
        // --dry alone does not turn the default pass into a dry run
        assert_eq!(parse(&["--dry"]).command(), OrganizeCommand::Once { dry_run: false });
    }

    #[test]
    fn test_once_and_watch_honor_dry() {
        assert_eq!(
            parse(&["--once", "--dry"]).command(),
            OrganizeCommand::Once { dry_run: true }
        );
        assert_eq!(
            parse(&["--watch", "--dry", "--config", "x.json"]).command(),
            OrganizeCommand::Watch { dry_run: true }
        );
    }

    #[test]
    fn test_once_wins_over_watch() {
        assert_eq!(
            parse(&["--once", "--watch"]).command(),
            OrganizeCommand::Once { dry_run: false }
        );
        assert_eq!(
            parse(&["--watch", "--once", "--dry"]).command(),
            OrganizeCommand::Once { dry_run: true }
        );
    }

    #[test]
    fn test_load_organizer_missing_config() {
        let temp = TempDir::new().unwrap();
        let result = load_organizer(&temp.path().join("config.json"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_watch_loop_survives_missing_watch_dir() {
        let temp = TempDir::new().unwrap();
        let mut config = OrganizerConfig::new(temp.path().join("missing").display().to_string());
        config.rules.push(RuleConfig {
            name: "all".to_string(),
            match_all: true,
            to_dir: Some("out".to_string()),
            ..Default::default()
        });
        let organizer = Organizer::new(config).unwrap();

        assert_eq!(watch_loop(&organizer, false, Some(1)), 0);
    }

    #[test]
    fn test_run_cli_once_dry_run_leaves_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "x").unwrap();
        let mut config = OrganizerConfig::new(temp.path().display().to_string());
        config.min_age_sec = 0;
        config.rules.push(RuleConfig {
            name: "all".to_string(),
            match_all: true,
            to_dir: Some("out".to_string()),
            ..Default::default()
        });
        let organizer = Organizer::new(config).unwrap();

        run_cli(OrganizeCommand::Once { dry_run: true }, &organizer).unwrap();
        assert!(temp.path().join("a.txt").is_file());
        assert!(!temp.path().join("out").exists());
    }
}
