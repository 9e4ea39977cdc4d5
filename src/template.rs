//! Placeholder expansion for destination paths and file names.
//!
//! Templates are expanded by a single left-to-right pass over a fixed
//! placeholder table. Substituted values are never rescanned, so a file stem
//! that happens to contain `{date}` is copied through untouched.
//!
//! Destination templates understand `{YYYY}`, `{MM}`, `{DD}`, `{date}` and
//! `{time}`, followed by environment variables (`$VAR`, `${VAR}`, `%VAR%`)
//! and a leading `~`. File-name templates understand `{stem}`, `{ext}`,
//! `{date}`, `{time}` and `{counter}`.
//!
//! ```
//! use chrono::{Local, TimeZone};
//! use dorg::template::{FileAttrs, expand_file_name};
//!
//! let now = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
//! let attrs = FileAttrs::new("report", "PDF");
//! assert_eq!(expand_file_name("{stem}_{date}", &attrs, &now, 0), "report_20240309.pdf");
//! ```

use chrono::{DateTime, Local};
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

/// Characters that cannot appear in a single path segment on common platforms.
const INVALID_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)|%([A-Za-z_][A-Za-z0-9_]*)%")
        .expect("environment variable pattern is valid")
});

/// Errors produced while turning a destination template into a path.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// The template starts with `~` but no home directory is known.
    #[error("cannot expand '~' in '{template}': home directory is unknown")]
    HomeUnavailable { template: String },

    /// The template expanded to nothing.
    #[error("template '{template}' expands to an empty path")]
    Empty { template: String },
}

/// Name attributes of the source file used by file-name templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttrs {
    /// File name without its final extension.
    pub stem: String,
    /// Final extension, lower-cased, without the dot. Empty when absent.
    pub ext: String,
}

impl FileAttrs {
    pub fn new(stem: impl Into<String>, ext: &str) -> Self {
        Self {
            stem: stem.into(),
            ext: ext.to_lowercase(),
        }
    }

    /// Splits a path's file name at its last dot.
    ///
    /// Dotfiles such as `.bashrc` have no extension, and a trailing dot
    /// (`notes.`) is kept as part of the stem.
    pub fn from_path(path: &Path) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match path.extension().map(|e| e.to_string_lossy()) {
            Some(ext) if !ext.is_empty() => {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Self::new(stem, &ext)
            }
            _ => Self::new(file_name, ""),
        }
    }
}

/// Expands a destination directory template into a path.
///
/// # Errors
///
/// Returns [`TemplateError::HomeUnavailable`] when a leading `~` cannot be
/// resolved and [`TemplateError::Empty`] when nothing is left after expansion.
pub fn expand_dir(template: &str, now: &DateTime<Local>) -> Result<PathBuf, TemplateError> {
    let year = now.format("%Y").to_string();
    let month = now.format("%m").to_string();
    let day = now.format("%d").to_string();
    let date = now.format("%Y%m%d").to_string();
    let time = now.format("%H%M%S").to_string();

    let table = [
        ("{YYYY}", year.as_str()),
        ("{MM}", month.as_str()),
        ("{DD}", day.as_str()),
        ("{date}", date.as_str()),
        ("{time}", time.as_str()),
    ];

    let expanded = expand_env_vars(&substitute(template, &table));
    let expanded = expand_home(&expanded).ok_or_else(|| TemplateError::HomeUnavailable {
        template: template.to_string(),
    })?;

    if expanded.as_os_str().is_empty() {
        return Err(TemplateError::Empty {
            template: template.to_string(),
        });
    }
    Ok(expanded)
}

/// Expands a destination template, anchoring a relative result at `base`.
pub fn expand_dir_under(
    template: &str,
    now: &DateTime<Local>,
    base: &Path,
) -> Result<PathBuf, TemplateError> {
    Ok(base.join(expand_dir(template, now)?))
}

/// Expands a rename template into the final file name.
///
/// Forbidden characters are replaced with `_`, then `.` plus the source
/// extension is appended whenever the extension is non-empty, even if the
/// template already used `{ext}` (`{stem}.{ext}` yields `name.ext.ext`).
pub fn expand_file_name(
    template: &str,
    attrs: &FileAttrs,
    now: &DateTime<Local>,
    counter: u32,
) -> String {
    let date = now.format("%Y%m%d").to_string();
    let time = now.format("%H%M%S").to_string();
    let counter = if counter == 0 {
        String::new()
    } else {
        counter.to_string()
    };

    let table = [
        ("{stem}", attrs.stem.as_str()),
        ("{ext}", attrs.ext.as_str()),
        ("{date}", date.as_str()),
        ("{time}", time.as_str()),
        ("{counter}", counter.as_str()),
    ];

    let name: String = substitute(template, &table)
        .chars()
        .map(|c| if INVALID_NAME_CHARS.contains(&c) { '_' } else { c })
        .collect();

    if attrs.ext.is_empty() {
        name
    } else {
        format!("{}.{}", name, attrs.ext)
    }
}

/// Replaces every table key found in `template` with its value in one pass.
fn substitute(template: &str, table: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match table.iter().find(|(key, _)| tail.starts_with(key)) {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Expands `$VAR`, `${VAR}` and `%VAR%`. Unset variables are left as written.
fn expand_env_vars(input: &str) -> String {
    ENV_VAR
        .replace_all(input, |caps: &Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();
            std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Expands a leading `~` to the user's home directory.
///
/// Returns `None` only when the input needs a home directory that cannot be
/// determined.
fn expand_home(input: &str) -> Option<PathBuf> {
    let Some(rest) = input.strip_prefix('~') else {
        return Some(PathBuf::from(input));
    };

    if !rest.is_empty() && !rest.starts_with(['/', '\\']) {
        // `~user` forms are not expanded.
        return Some(PathBuf::from(input));
    }

    let home = dirs::home_dir()?;
    let rest = rest.trim_start_matches(['/', '\\']);
    if rest.is_empty() {
        Some(home)
    } else {
        Some(home.join(rest))
    }
}
