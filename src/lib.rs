//! dorg - a rule-driven download-folder organizer
//!
//! This library watches one directory, moves settled files into destination
//! folders chosen by an ordered list of rules (renaming them from templates
//! along the way), and can sweep stray subfolders into a dated archive.
//! Configuration is a JSON file that tolerates comments and trailing commas,
//! or a TOML file.

pub mod candidate;
pub mod cli;
pub mod collector;
pub mod config;
pub mod logging;
pub mod marker;
pub mod mime;
pub mod mover;
pub mod organizer;
pub mod output;
pub mod rules;
pub mod template;

pub use config::{ConfigError, OrganizerConfig, RuleConfig};
pub use mover::{MoveError, SafeMover};
pub use organizer::{OrganizeError, Organizer, PassReport};
pub use rules::{CompiledRule, RuleSet};

pub use cli::{Cli, OrganizeCommand, run_cli};
