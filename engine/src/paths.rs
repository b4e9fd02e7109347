//! Path resolution helpers.
//!
//! - Expanding `~` and validating raw source/target input
//! - Computing source-relative paths structurally
//! - Naming duplicate copies

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use crate::error::{EngineError, Result};

/// Resolve a raw path from configuration.
///
/// A leading `~` (alone or followed by a separator) is replaced with the
/// user's home directory. `~user` forms are left untouched.
///
/// # Errors
/// Returns `EngineError::Configuration` if the input is empty or blank,
/// contains a NUL byte, or needs a home directory that cannot be found.
pub fn resolve(raw: &Path) -> Result<PathBuf> {
    let text = raw.to_string_lossy();
    if text.trim().is_empty() {
        return Err(EngineError::configuration("path is empty"));
    }
    if text.contains('\0') {
        return Err(EngineError::configuration(format!(
            "path contains a NUL byte: {}",
            raw.display()
        )));
    }

    let mut components = raw.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            let home = dirs::home_dir().ok_or_else(|| {
                EngineError::configuration(format!(
                    "cannot expand {}: home directory is unknown",
                    raw.display()
                ))
            })?;
            Ok(home.join(components.as_path()))
        }
        _ => Ok(raw.to_path_buf()),
    }
}

/// Strip `root` from the front of `path`, component by component.
///
/// Returns `None` if `path` does not live under `root`.
pub fn relative_to_root(root: &Path, path: &Path) -> Option<PathBuf> {
    path.strip_prefix(root).ok().map(Path::to_path_buf)
}

/// Name for the `n`th duplicate of `path`: `name (n).ext`.
///
/// The counter goes before the last extension; files without an extension
/// (including dotfiles such as `.bashrc`) get it at the end.
pub fn duplicate_name(path: &Path, n: u32) -> PathBuf {
    let mut name: OsString = path
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_default();
    name.push(format!(" ({})", n));
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }

    path.with_file_name(name)
}

/// Extension as written in filters, without a leading dot.
pub(crate) fn normalize_extension(ext: &str) -> &str {
    ext.strip_prefix('.').unwrap_or(ext)
}
