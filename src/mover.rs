/// Collision-safe moves of files and directories.
///
/// Destinations are created on demand. With `ensure_unique` the first free
/// name among `name`, `name_1`, `name_2`, ... is chosen (the counter goes
/// before a file's extension). The existence check and the move are separate steps, so
/// a concurrent writer could still claim the chosen name in between.
///
/// A move is a rename; when source and destination are on different
/// filesystems it falls back to copy-then-delete.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Errors that can occur while moving an entry.
#[derive(Debug, Error)]
pub enum MoveError {
    /// Failed to create the destination directory.
    #[error("Failed to create directory {}: {error}", path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        error: io::Error,
    },

    /// The rename (or its copy fallback) failed.
    #[error("Failed to move {} to {}: {error}", from.display(), to.display())]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        error: io::Error,
    },

    /// The source path has no final component.
    #[error("Source has no name component: {}", .0.display())]
    NoFileName(PathBuf),
}

impl MoveError {
    fn move_failed(from: &Path, to: &Path, error: io::Error) -> Self {
        Self::MoveFailed {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            error,
        }
    }
}

pub type MoveResult<T> = Result<T, MoveError>;

/// Moves files and directories without clobbering existing entries.
pub struct SafeMover;

impl SafeMover {
    /// Moves `source` into `destination_dir` as `desired_name`.
    ///
    /// Without `ensure_unique` an existing entry of that name is replaced
    /// where the platform's rename allows it.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dorg::mover::SafeMover;
    /// use std::path::Path;
    ///
    /// let target = SafeMover::move_file(
    ///     Path::new("/home/me/Downloads/report.pdf"),
    ///     Path::new("/home/me/Documents/2024"),
    ///     "report_20240309.pdf",
    ///     true,
    /// )?;
    /// println!("moved to {}", target.display());
    /// # Ok::<(), dorg::mover::MoveError>(())
    /// ```
    pub fn move_file(
        source: &Path,
        destination_dir: &Path,
        desired_name: &str,
        ensure_unique: bool,
    ) -> MoveResult<PathBuf> {
        Self::create_destination(destination_dir)?;

        let target = if ensure_unique {
            Self::unique_file_path(destination_dir, desired_name)
        } else {
            destination_dir.join(desired_name)
        };

        relocate_file(source, &target).map_err(|e| MoveError::move_failed(source, &target, e))?;
        Ok(target)
    }

    /// Moves the directory `source` into `destination_dir`, keeping its name
    /// unless `ensure_unique` needs a `_N` suffix.
    ///
    /// The suffix goes on the whole name: `photos.2023` becomes
    /// `photos.2023_1`, never `photos_1.2023`. The whole tree is copied when
    /// the rename crosses devices.
    ///
    /// # Arguments
    ///
    /// * `source` - The directory to move
    /// * `destination_dir` - The parent it should end up in; created if missing
    /// * `ensure_unique` - Pick a free `_N` name instead of colliding
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dorg::mover::SafeMover;
    /// use std::path::Path;
    ///
    /// let target = SafeMover::move_dir(
    ///     Path::new("/home/me/Downloads/misc"),
    ///     Path::new("/home/me/Downloads/_Folders/2024-03"),
    ///     true,
    /// )?;
    /// println!("archived to {}", target.display());
    /// # Ok::<(), dorg::mover::MoveError>(())
    /// ```
    pub fn move_dir(
        source: &Path,
        destination_dir: &Path,
        ensure_unique: bool,
    ) -> MoveResult<PathBuf> {
        let name = source
            .file_name()
            .ok_or_else(|| MoveError::NoFileName(source.to_path_buf()))?
            .to_string_lossy()
            .into_owned();

        Self::create_destination(destination_dir)?;

        let target = if ensure_unique {
            Self::unique_dir_path(destination_dir, &name)
        } else {
            destination_dir.join(&name)
        };

        relocate_dir(source, &target).map_err(|e| MoveError::move_failed(source, &target, e))?;
        Ok(target)
    }

    /// First free path among `name`, `stem_1.ext`, `stem_2.ext`, ...
    pub fn unique_file_path(dir: &Path, name: &str) -> PathBuf {
        let candidate = dir.join(name);
        if !occupied(&candidate) {
            return candidate;
        }

        let as_path = Path::new(name);
        let stem = as_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string());
        let ext = as_path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        (1..)
            .map(|i| dir.join(format!("{stem}_{i}{ext}")))
            .find(|path| !occupied(path))
            .unwrap_or(candidate)
    }

    /// First free path among `name`, `name_1`, `name_2`, ...
    pub fn unique_dir_path(dir: &Path, name: &str) -> PathBuf {
        let candidate = dir.join(name);
        if !occupied(&candidate) {
            return candidate;
        }

        (1..)
            .map(|i| dir.join(format!("{name}_{i}")))
            .find(|path| !occupied(path))
            .unwrap_or(candidate)
    }

    fn create_destination(dir: &Path) -> MoveResult<()> {
        fs::create_dir_all(dir).map_err(|error| MoveError::DirectoryCreationFailed {
            path: dir.to_path_buf(),
            error,
        })
    }
}

/// Any entry, including a dangling symlink, occupies its name.
fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

fn is_cross_device(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::CrossesDevices || error.raw_os_error() == Some(18)
}

fn relocate_file(source: &Path, target: &Path) -> io::Result<()> {
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            tracing::debug!(src = %source.display(), dest = %target.display(), "rename crosses devices, copying");
            fs::copy(source, target)?;
            fs::remove_file(source)
        }
        Err(e) => Err(e),
    }
}

fn relocate_dir(source: &Path, target: &Path) -> io::Result<()> {
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            tracing::debug!(src = %source.display(), dest = %target.display(), "rename crosses devices, copying tree");
            copy_tree(source, target)?;
            fs::remove_dir_all(source)
        }
        Err(e) => Err(e),
    }
}

fn copy_tree(source: &Path, target: &Path) -> io::Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(io::Error::other)?;
        let destination = target.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination)?;
        } else {
            fs::copy(entry.path(), &destination)?;
        }
    }
    Ok(())
}
