//! Logging setup for the `dorg` binary.
//!
//! Events go to stdout and are appended to `dorg.log` in the given log
//! directory. The level comes from `RUST_LOG` and defaults to `info`.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE_NAME: &str = "dorg.log";

/// Installs the global subscriber. Call once, from `main`.
///
/// If the log file cannot be opened, logging continues on stdout only and a
/// warning is emitted.
pub fn init(log_dir: &Path) {
    let (file_layer, file_error) = match open_log_file(log_dir) {
        Ok(file) => (
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file))),
            None,
        ),
        Err(e) => (None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .with(file_layer)
        .init();

    if let Some(e) = file_error {
        tracing::warn!(dir = %log_dir.display(), error = %e, "file logging disabled");
    }
}

fn open_log_file(log_dir: &Path) -> io::Result<File> {
    fs::create_dir_all(log_dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(LOG_FILE_NAME))
}
