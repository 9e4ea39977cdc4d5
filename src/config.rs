//! Organizer configuration.
//!
//! Configuration is normally a JSON document that may contain `//` and
//! `/* */` comments and trailing commas. A file with a `.toml` extension is
//! read as TOML instead; both formats describe the same model.
//!
//! ```json
//! {
//!   // where downloads land
//!   "watch_dir": "~/Downloads",
//!   "min_age_sec": 10,
//!   "ignore_ext": [".crdownload", ".part"],
//!   "collect_unmanaged_dirs": true,
//!   "rules": [
//!     { "name": "PDFs", "match_ext": ["pdf"], "to_dir": "~/Documents/PDF/{YYYY}",
//!       "rename": "{stem}_{date}" },
//!   ]
//! }
//! ```

use crate::rules::RuleSet;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

/// Default name of the sentinel file marking organizer-owned directories.
pub const DEFAULT_MANAGED_MARKER: &str = ".dorg_managed";

/// Default archive location for unmanaged folders.
pub const DEFAULT_UNMANAGED_DIR_TARGET: &str = "~/Downloads/_Folders/{YYYY}-{MM}";

/// Default rename template.
pub const DEFAULT_RENAME: &str = "{stem}";

// String literals are matched first so their contents survive untouched.
static COMMENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(?:\\.|[^"\\])*"|//[^\n]*|/\*[\s\S]*?\*/"#).expect("comment pattern is valid")
});

static TRAILING_COMMAS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(?:\\.|[^"\\])*"|,(\s*[}\]])"#).expect("trailing comma pattern is valid")
});

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file exists but could not be read.
    #[error("IO error reading configuration {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid syntax or structure.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// A rule contains a glob that cannot be compiled.
    #[error("Invalid glob pattern '{pattern}' in rule '{rule}': {reason}")]
    InvalidGlobPattern {
        rule: String,
        pattern: String,
        reason: String,
    },
}

/// Top-level organizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizerConfig {
    /// Directory to organize. Template-expandable.
    pub watch_dir: String,

    /// Seconds between passes in watch mode.
    #[serde(default = "default_interval_sec")]
    pub interval_sec: u64,

    /// Entries modified more recently than this are left for a later pass.
    #[serde(default = "default_min_age_sec")]
    pub min_age_sec: u64,

    /// File-name suffixes to ignore (e.g. `.part`, `.crdownload`).
    #[serde(default)]
    pub ignore_ext: Vec<String>,

    /// Exact file or folder names to ignore.
    #[serde(default)]
    pub ignore_names: Vec<String>,

    #[serde(default = "default_managed_marker")]
    pub managed_marker: String,

    /// Whether stray subfolders are moved to `unmanaged_dir_target`.
    #[serde(default)]
    pub collect_unmanaged_dirs: bool,

    /// Folder names under the watch directory never collected.
    #[serde(default)]
    pub unmanaged_dirs_exclude: Vec<String>,

    #[serde(default = "default_unmanaged_dir_target")]
    pub unmanaged_dir_target: String,

    /// Rules in evaluation order.
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// A single organizing rule as written in the configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(default)]
    pub name: String,

    /// Extensions without the dot, compared case-insensitively.
    #[serde(default)]
    pub match_ext: Vec<String>,

    /// MIME type prefixes such as `image/` or `application/pdf`.
    #[serde(default)]
    pub match_mime: Vec<String>,

    /// Glob patterns matched against the bare file name.
    #[serde(default)]
    pub match_glob: Vec<String>,

    #[serde(default)]
    pub match_all: bool,

    /// Destination directory template.
    #[serde(default)]
    pub to_dir: Option<String>,

    /// File-name template; `{stem}` when absent or empty.
    #[serde(default)]
    pub rename: Option<String>,

    #[serde(default = "default_ensure_unique")]
    pub ensure_unique: bool,
}

fn default_interval_sec() -> u64 {
    5
}

fn default_min_age_sec() -> u64 {
    10
}

fn default_managed_marker() -> String {
    DEFAULT_MANAGED_MARKER.to_string()
}

fn default_unmanaged_dir_target() -> String {
    DEFAULT_UNMANAGED_DIR_TARGET.to_string()
}

fn default_ensure_unique() -> bool {
    true
}

impl OrganizerConfig {
    /// Creates a configuration for `watch_dir` with every other field defaulted.
    pub fn new(watch_dir: impl Into<String>) -> Self {
        Self {
            watch_dir: watch_dir.into(),
            interval_sec: default_interval_sec(),
            min_age_sec: default_min_age_sec(),
            ignore_ext: Vec::new(),
            ignore_names: Vec::new(),
            managed_marker: default_managed_marker(),
            collect_unmanaged_dirs: false,
            unmanaged_dirs_exclude: Vec::new(),
            unmanaged_dir_target: default_unmanaged_dir_target(),
            rules: Vec::new(),
        }
    }

    /// Loads configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the file does not exist,
    /// `ConfigError::Io` if it cannot be read and `ConfigError::Invalid` if it
    /// cannot be parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    /// Parses comment-tolerant JSON.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(&strip_json_extensions(text))
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Parses TOML.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Sleep between passes, never shorter than one second.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_sec.max(1))
    }

    /// Compiles the rules into their matching form.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidGlobPattern` for a glob that does not parse
    /// even when read leniently.
    pub fn compile_rules(&self) -> Result<RuleSet, ConfigError> {
        RuleSet::compile(&self.rules)
    }
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            match_ext: Vec::new(),
            match_mime: Vec::new(),
            match_glob: Vec::new(),
            match_all: false,
            to_dir: None,
            rename: None,
            ensure_unique: default_ensure_unique(),
        }
    }
}

impl RuleConfig {
    /// The rename template, falling back to `{stem}`.
    pub fn rename_template(&self) -> &str {
        match self.rename.as_deref() {
            Some(rename) if !rename.is_empty() => rename,
            _ => DEFAULT_RENAME,
        }
    }

    /// The destination template, if one is configured and non-empty.
    pub fn destination_template(&self) -> Option<&str> {
        self.to_dir.as_deref().filter(|dir| !dir.is_empty())
    }
}

/// Removes comments and trailing commas so the text is plain JSON.
fn strip_json_extensions(text: &str) -> String {
    let without_comments = COMMENTS.replace_all(text, |caps: &Captures| {
        let matched = &caps[0];
        if matched.starts_with('"') {
            matched.to_string()
        } else {
            String::new()
        }
    });

    TRAILING_COMMAS
        .replace_all(&without_comments, |caps: &Captures| match caps.get(1) {
            Some(closing) => closing.as_str().to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
