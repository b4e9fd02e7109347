//! Per-entry transfer decisions.
//!
//! `decide` is pure: everything it needs about the filesystem is gathered
//! by the engine into `EntryFacts` first, so the decision table can be
//! tested without touching a disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::model::{BackupJob, IgnoreRule, OverwriteCondition, SourceEntry};
use crate::paths::normalize_extension;

/// What to do with one source entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateDir,
    SkipIgnoredDir,
    SkipDryRunDir,
    SkipIgnoredFile(IgnoreRule),
    SkipDryRunFile,
    /// Copy, replacing whatever is at the destination
    CopyPlain,
    /// Copy only if nothing exists at the destination
    CopyIfAbsent,
    /// Destination exists and the job keeps existing files
    SkipExisting,
    /// Copy under the first free `name (N).ext`
    CopyDuplicate,
    /// Copy, the source changed inside the freshness window
    CopyIfRecentlyModified,
    /// Source is older than the freshness window
    SkipStaleFile,
}

/// Filesystem state the decision depends on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryFacts {
    /// Something already exists at the entry's target path
    pub target_exists: bool,

    /// Age of the source file; only needed for `RecentlyModified`
    pub modified_age: Option<Duration>,
}

/// True if the job needs the source file's age to decide.
pub fn needs_age(job: &BackupJob) -> bool {
    job.overwrite && job.overwrite_condition == OverwriteCondition::RecentlyModified
}

/// Decide what to do with `entry`.
pub fn decide(entry: &SourceEntry, job: &BackupJob, facts: &EntryFacts) -> Action {
    if entry.is_directory {
        return decide_directory(entry, job);
    }

    if job.dry_run {
        return Action::SkipDryRunFile;
    }
    if let Some(parent) = entry.relative_path.parent() {
        if is_in_ignored_directory(job, parent) {
            return Action::SkipIgnoredFile(IgnoreRule::Directory);
        }
    }
    if matches_path(&job.ignored_files, job, &entry.relative_path) {
        return Action::SkipIgnoredFile(IgnoreRule::File);
    }
    if has_ignored_extension(job, &entry.relative_path) {
        return Action::SkipIgnoredFile(IgnoreRule::Extension);
    }

    match (job.overwrite, job.overwrite_condition) {
        (true, OverwriteCondition::RecentlyModified) => {
            let window = Duration::from_secs(job.recent_window_hours.saturating_mul(3600));
            match facts.modified_age {
                Some(age) if age > window => Action::SkipStaleFile,
                _ => Action::CopyIfRecentlyModified,
            }
        }
        (true, _) => Action::CopyPlain,
        (false, OverwriteCondition::Ignore) => {
            if facts.target_exists {
                Action::SkipExisting
            } else {
                Action::CopyIfAbsent
            }
        }
        (false, OverwriteCondition::Duplicate) => {
            if facts.target_exists {
                Action::CopyDuplicate
            } else {
                Action::CopyPlain
            }
        }
        (false, _) => Action::CopyPlain,
    }
}

fn decide_directory(entry: &SourceEntry, job: &BackupJob) -> Action {
    if is_in_ignored_directory(job, &entry.relative_path) {
        Action::SkipIgnoredDir
    } else if job.dry_run {
        Action::SkipDryRunDir
    } else {
        Action::CreateDir
    }
}

/// True if `relative_dir` or any of its ancestors is an ignored directory.
fn is_in_ignored_directory(job: &BackupJob, relative_dir: &Path) -> bool {
    if job.ignored_directories.is_empty() {
        return false;
    }
    relative_dir
        .ancestors()
        .filter(|a| !a.as_os_str().is_empty())
        .any(|a| matches_path(&job.ignored_directories, job, a))
}

/// A filter entry matches either the source-relative path or the full
/// source path.
fn matches_path(filters: &[PathBuf], job: &BackupJob, relative: &Path) -> bool {
    if filters.is_empty() {
        return false;
    }
    let full = job.source.join(relative);
    filters
        .iter()
        .any(|f| f.as_path() == relative || f.as_path() == full.as_path())
}

fn has_ignored_extension(job: &BackupJob, relative: &Path) -> bool {
    let Some(ext) = relative.extension() else {
        return false;
    };
    job.ignored_ext
        .iter()
        .any(|ignored| ext == normalize_extension(ignored))
}
