//! First-match-wins rule evaluation.
//!
//! Every configured rule is compiled into an ordered list of predicates:
//! extension set, MIME prefixes, glob patterns, then the catch-all flag.
//! Rules are tried in configuration order and the first rule with any
//! satisfied predicate wins, so an earlier broad rule beats a later narrow one.

use crate::config::{ConfigError, RuleConfig};
use crate::mime::MimeTable;
use crate::template::FileAttrs;
use glob::{Pattern, PatternError};
use std::collections::HashSet;
use std::path::Path;

/// What a rule is matched against: name, extension and guessed MIME type.
#[derive(Debug, Clone, Copy)]
pub struct MatchSubject<'a> {
    /// Bare file name, e.g. `report.pdf`.
    pub file_name: &'a str,
    /// Lower-case extension without the dot; empty when absent.
    pub ext: &'a str,
    /// MIME type guessed from the name, if known.
    pub mime: Option<&'a str>,
}

/// A single match predicate of a rule.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Lower-case extension membership.
    Extension(HashSet<String>),
    /// Case-insensitive MIME prefix. Never matches an unknown MIME type.
    MimePrefix(Vec<String>),
    /// Glob against the bare file name.
    Glob(Vec<Pattern>),
    /// Matches everything.
    All,
}

impl Predicate {
    pub fn matches(&self, subject: &MatchSubject<'_>) -> bool {
        match self {
            Predicate::Extension(exts) => exts.contains(subject.ext),
            Predicate::MimePrefix(prefixes) => subject.mime.is_some_and(|mime| {
                let mime = mime.to_lowercase();
                prefixes.iter().any(|prefix| mime.starts_with(prefix.as_str()))
            }),
            Predicate::Glob(patterns) => patterns
                .iter()
                .any(|pattern| pattern.matches(subject.file_name)),
            Predicate::All => true,
        }
    }
}

/// A rule together with its compiled predicates.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    config: RuleConfig,
    predicates: Vec<Predicate>,
}

impl CompiledRule {
    /// Compiles a rule. Empty predicate lists are dropped since they can never match.
    ///
    /// Globs follow shell matching: a `[` that opens no complete class is an
    /// ordinary character and `**` means the same as `*`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidGlobPattern` if a glob does not parse even
    /// after that leniency.
    pub fn compile(config: &RuleConfig) -> Result<Self, ConfigError> {
        let mut predicates = Vec::with_capacity(4);

        if !config.match_ext.is_empty() {
            predicates.push(Predicate::Extension(
                config.match_ext.iter().map(|e| e.to_lowercase()).collect(),
            ));
        }

        if !config.match_mime.is_empty() {
            predicates.push(Predicate::MimePrefix(
                config.match_mime.iter().map(|m| m.to_lowercase()).collect(),
            ));
        }

        if !config.match_glob.is_empty() {
            let patterns = config
                .match_glob
                .iter()
                .map(|pattern| {
                    compile_glob(pattern).map_err(|e| ConfigError::InvalidGlobPattern {
                        rule: config.name.clone(),
                        pattern: pattern.clone(),
                        reason: e.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            predicates.push(Predicate::Glob(patterns));
        }

        if config.match_all {
            predicates.push(Predicate::All);
        }

        Ok(Self {
            config: config.clone(),
            predicates,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &RuleConfig {
        &self.config
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// True if any predicate matches, checked in declaration order.
    pub fn matches(&self, subject: &MatchSubject<'_>) -> bool {
        self.predicates.iter().any(|p| p.matches(subject))
    }
}

/// Compiles `pattern`, retrying with [`lenient_glob`] when it does not parse.
fn compile_glob(pattern: &str) -> Result<Pattern, PatternError> {
    Pattern::new(pattern).or_else(|_| {
        let lenient = lenient_glob(pattern);
        tracing::debug!(pattern, lenient = %lenient, "glob read leniently");
        Pattern::new(&lenient)
    })
}

/// Rewrites shell-style constructs the `glob` crate rejects: an unterminated
/// `[` becomes the literal class `[[]` and runs of `*` collapse to one.
fn lenient_glob(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() + 4);
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => {
                out.push('*');
                while chars.get(i + 1) == Some(&'*') {
                    i += 1;
                }
            }
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    out.extend(&chars[i..=end]);
                    i = end;
                }
                None => out.push_str("[[]"),
            },
            c => out.push(c),
        }
        i += 1;
    }
    out
}

/// Index of the `]` closing the class opened at `start`. A `]` right after
/// the opening `[` or `[!` is part of the class.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start + 1;
    if chars.get(j) == Some(&'!') {
        j += 1;
    }
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    chars[j.min(chars.len())..]
        .iter()
        .position(|&c| c == ']')
        .map(|offset| j + offset)
}

/// Ordered, compiled rule list.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
    mime: MimeTable,
}

impl RuleSet {
    /// Compiles rules, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError::InvalidGlobPattern` encountered.
    pub fn compile(rules: &[RuleConfig]) -> Result<Self, ConfigError> {
        let rules = rules
            .iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            rules,
            mime: MimeTable::default(),
        })
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Finds the first rule matching the file at `path`, judged by name only.
    ///
    /// The extension and the MIME type guessed from the name are derived
    /// here; the file itself is never opened.
    ///
    /// # Arguments
    ///
    /// * `path` - The candidate file; only its final component is used
    ///
    /// # Returns
    ///
    /// The earliest rule in configuration order with a satisfied predicate,
    /// or `None` when no rule applies and the file stays where it is.
    ///
    /// # Examples
    ///
    /// ```
    /// use dorg::config::RuleConfig;
    /// use dorg::rules::RuleSet;
    /// use std::path::Path;
    ///
    /// let rules = RuleSet::compile(&[
    ///     RuleConfig {
    ///         name: "images".to_string(),
    ///         match_mime: vec!["image/".to_string()],
    ///         to_dir: Some("~/Pictures".to_string()),
    ///         ..Default::default()
    ///     },
    /// ])?;
    ///
    /// let rule = rules.find_match(Path::new("holiday.JPG"));
    /// assert_eq!(rule.map(|r| r.name()), Some("images"));
    /// assert!(rules.find_match(Path::new("notes.txt")).is_none());
    /// # Ok::<(), dorg::config::ConfigError>(())
    /// ```
    pub fn find_match(&self, path: &Path) -> Option<&CompiledRule> {
        let file_name = path.file_name()?.to_string_lossy();
        let attrs = FileAttrs::from_path(path);
        let subject = MatchSubject {
            file_name: &file_name,
            ext: &attrs.ext,
            mime: self.mime.guess(&file_name),
        };
        self.match_subject(&subject)
    }

    /// Finds the first rule matching an already-described file.
    pub fn match_subject(&self, subject: &MatchSubject<'_>) -> Option<&CompiledRule> {
        self.rules.iter().find(|rule| rule.matches(subject))
    }
}
