//! Filesystem operations module.
//!
//! This module provides low-level operations for:
//! - Enumerating the source tree (`TreeEnumerator`)
//! - Creating target directories
//! - Copying files with modification-time preservation, optionally refusing
//!   to replace an existing destination
//! - Reading file age for freshness checks
//! - Emptying a directory (`empty_directory`)

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{EngineError, Result};
use crate::model::SourceEntry;
use crate::paths;

/// Lazy, single-pass walk over a source tree.
///
/// Yields every directory and file below `source_root` (the root itself is
/// excluded) in depth-first order: a directory always comes before its
/// contents. Siblings are sorted by file name so runs are reproducible.
/// Symbolic links are followed: a link to a directory is walked like a
/// directory and a link to a file is copied as that file. A link that loops
/// back to one of its ancestors, or that dangles, yields
/// `EngineError::EnumerationFailed`.
pub struct TreeEnumerator {
    source_root: PathBuf,
    target_root: PathBuf,
    walker: walkdir::IntoIter,
}

impl TreeEnumerator {
    pub fn new(source_root: &Path, target_root: &Path) -> Self {
        let walker = WalkDir::new(source_root)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter();

        TreeEnumerator {
            source_root: source_root.to_path_buf(),
            target_root: target_root.to_path_buf(),
            walker,
        }
    }
}

impl Iterator for TreeEnumerator {
    type Item = Result<SourceEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = match self.walker.next()? {
            Ok(entry) => entry,
            Err(e) => {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.source_root.clone());
                let source = e.into_io_error().unwrap_or_else(|| {
                    io::Error::new(io::ErrorKind::Other, "filesystem loop detected")
                });
                return Some(Err(EngineError::EnumerationFailed { path, source }));
            }
        };

        let Some(relative_path) = paths::relative_to_root(&self.source_root, entry.path()) else {
            return Some(Err(EngineError::EnumerationFailed {
                path: entry.path().to_path_buf(),
                source: io::Error::new(
                    io::ErrorKind::InvalidData,
                    "entry is outside the source root",
                ),
            }));
        };

        let target_path = self.target_root.join(&relative_path);
        Some(Ok(SourceEntry {
            is_directory: entry.file_type().is_dir(),
            source_path: entry.into_path(),
            target_path,
            relative_path,
        }))
    }
}

/// Create a single directory.
///
/// Returns `Ok(true)` if the directory was created and `Ok(false)` if it was
/// already there. The parent must exist.
///
/// # Errors
/// Returns `EngineError::DirectoryCreationFailed` if creation fails or a
/// non-directory is in the way.
pub fn create_dir(path: &Path) -> Result<bool> {
    match fs::create_dir(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(false),
        Err(e) => Err(EngineError::DirectoryCreationFailed {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Copy a file, replacing the destination if it exists.
///
/// The source is opened before the destination is touched, so an unreadable
/// source never leaves an empty file behind.
///
/// # Returns
/// Number of bytes copied
pub fn copy_file_with_metadata(src: &Path, dst: &Path) -> Result<u64> {
    let source = open_source(src)?;
    let dst_file = File::create(dst).map_err(|e| EngineError::WriteError {
        path: dst.to_path_buf(),
        source: e,
    })?;
    write_contents(source, src, dst, dst_file)
}

/// Copy a file only if nothing exists at `dst`.
///
/// The destination is created exclusively, so an entry that appears between
/// the caller's check and the copy is still never replaced.
///
/// # Returns
/// `Some(bytes)` if the file was copied, `None` if `dst` already existed
pub fn copy_file_if_absent(src: &Path, dst: &Path) -> Result<Option<u64>> {
    let source = open_source(src)?;
    let dst_file = match OpenOptions::new().write(true).create_new(true).open(dst) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(None),
        Err(e) => {
            return Err(EngineError::WriteError {
                path: dst.to_path_buf(),
                source: e,
            })
        }
    };
    write_contents(source, src, dst, dst_file).map(Some)
}

/// Copy a file next to an existing `dst` under the first free duplicate
/// name: `name (1).ext`, `name (2).ext`, ...
///
/// # Returns
/// The path written and the number of bytes copied
pub fn copy_file_as_duplicate(src: &Path, dst: &Path) -> Result<(PathBuf, u64)> {
    let mut n: u32 = 1;
    loop {
        let candidate = paths::duplicate_name(dst, n);
        if let Some(bytes) = copy_file_if_absent(src, &candidate)? {
            return Ok((candidate, bytes));
        }
        n = n.checked_add(1).ok_or_else(|| EngineError::WriteError {
            path: dst.to_path_buf(),
            source: io::Error::new(io::ErrorKind::AlreadyExists, "no free duplicate name"),
        })?;
    }
}

struct OpenSource {
    file: File,
    modified: SystemTime,
}

fn open_source(src: &Path) -> Result<OpenSource> {
    let read_error = |e| EngineError::ReadError {
        path: src.to_path_buf(),
        source: e,
    };
    let file = File::open(src).map_err(read_error)?;
    let modified = file.metadata().and_then(|m| m.modified()).map_err(read_error)?;
    Ok(OpenSource { file, modified })
}

fn write_contents(source: OpenSource, src: &Path, dst: &Path, mut dst_file: File) -> Result<u64> {
    let OpenSource { mut file, modified } = source;

    let bytes_copied = io::copy(&mut file, &mut dst_file).map_err(|e| {
        if e.kind() == io::ErrorKind::PermissionDenied {
            EngineError::WriteError {
                path: dst.to_path_buf(),
                source: e,
            }
        } else {
            EngineError::ReadError {
                path: src.to_path_buf(),
                source: e,
            }
        }
    })?;
    drop(dst_file);

    if let Err(e) = filetime::set_file_mtime(dst, filetime::FileTime::from_system_time(modified)) {
        warn!(path = %dst.display(), error = %e, "Could not preserve modification time");
    }

    Ok(bytes_copied)
}

/// Time since `path` was last modified.
///
/// A modification time in the future counts as zero age.
pub fn modified_age(path: &Path) -> Result<Duration> {
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| EngineError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO))
}

/// Remove everything inside `path`, keeping `path` itself.
///
/// Files and symlinks are unlinked; subdirectories are removed with their
/// contents. Emptying an already-empty directory is a no-op.
///
/// # Returns
/// Number of top-level entries removed
pub fn empty_directory(path: &Path) -> Result<usize> {
    let entries = fs::read_dir(path).map_err(|e| EngineError::EnumerationFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut removed = 0;
    for entry in entries {
        let entry = entry.map_err(|e| EngineError::EnumerationFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        let entry_path = entry.path();
        let file_type = entry.file_type().map_err(|e| EngineError::EnumerationFailed {
            path: entry_path.clone(),
            source: e,
        })?;

        let outcome = if file_type.is_dir() {
            fs::remove_dir_all(&entry_path)
        } else {
            fs::remove_file(&entry_path)
        };
        outcome.map_err(|e| EngineError::RemoveFailed {
            path: entry_path.clone(),
            source: e,
        })?;

        debug!(path = %entry_path.display(), "Removed");
        removed += 1;
    }

    Ok(removed)
}
