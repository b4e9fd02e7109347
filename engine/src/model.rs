//! Core data model for backup jobs.
//!
//! This module defines the main data structures for a backup run:
//! - BackupJob: the resolved, immutable configuration of one run
//! - SourceEntry: a single file or directory found in the source tree
//! - TransferResult: the summary produced by a completed run
//! - OverwriteCondition, EntryOutcome, SkipReason: enums controlling and
//!   describing per-entry behavior

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::Local;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, Result};

/// Freshness window used by `RecentlyModified` when none is configured.
pub const DEFAULT_RECENT_WINDOW_HOURS: u64 = 7 * 24;

/// Timestamp layout for `TransferResult::completed_at`.
pub const COMPLETED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single backup run, resolved and validated by `create_job`.
///
/// The job never changes once built. Filter lists are owned by the job, so
/// two jobs never share filter state.
#[derive(Debug, Clone)]
pub struct BackupJob {
    /// Identifier attached to every log record of the run
    pub id: Uuid,

    /// Resolved source directory
    pub source: PathBuf,

    /// Resolved target directory
    pub target: PathBuf,

    /// Master switch for replacing files that already exist in the target
    pub overwrite: bool,

    /// How existing destination entries are handled
    pub overwrite_condition: OverwriteCondition,

    /// Extensions that are never copied (as configured, with or without dot)
    pub ignored_ext: Vec<String>,

    /// Files that are never copied
    pub ignored_files: Vec<PathBuf>,

    /// Directories that are neither created nor descended into
    pub ignored_directories: Vec<PathBuf>,

    /// Decide and log only, never touch the target
    pub dry_run: bool,

    /// Freshness window for `OverwriteCondition::RecentlyModified`
    pub recent_window_hours: u64,
}

/// Policy for destination entries that already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverwriteCondition {
    /// Refuse to run against a non-empty target unless overwrite is on
    #[default]
    #[serde(alias = "Target Empty", alias = "TargetEmpty")]
    TargetEmpty,
    /// Keep whatever is already in the target
    #[serde(alias = "Ignore")]
    Ignore,
    /// Keep both copies, the new one gets a " (N)" suffix
    #[serde(alias = "Duplicate")]
    Duplicate,
    /// Only overwrite with files modified inside the freshness window
    #[serde(alias = "Recently Modified", alias = "RecentlyModified")]
    RecentlyModified,
}

impl fmt::Display for OverwriteCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverwriteCondition::TargetEmpty => write!(f, "target-empty"),
            OverwriteCondition::Ignore => write!(f, "ignore"),
            OverwriteCondition::Duplicate => write!(f, "duplicate"),
            OverwriteCondition::RecentlyModified => write!(f, "recently-modified"),
        }
    }
}

impl FromStr for OverwriteCondition {
    type Err = EngineError;

    /// Accepts kebab-case, PascalCase and the spaced spellings
    /// ("Target Empty"), case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "targetempty" => Ok(OverwriteCondition::TargetEmpty),
            "ignore" => Ok(OverwriteCondition::Ignore),
            "duplicate" => Ok(OverwriteCondition::Duplicate),
            "recentlymodified" => Ok(OverwriteCondition::RecentlyModified),
            _ => Err(EngineError::configuration(format!(
                "Invalid overwrite condition '{}'. Must be 'target-empty', 'ignore', \
                 'duplicate', or 'recently-modified'",
                s
            ))),
        }
    }
}

/// A file or directory found while walking the source tree.
///
/// Entries are produced one at a time by `TreeEnumerator` and dropped once
/// the engine has acted on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Path below the source root (never empty, never absolute)
    pub relative_path: PathBuf,

    /// True if this entry is a directory or a link to one
    pub is_directory: bool,

    /// Full path in the source tree
    pub source_path: PathBuf,

    /// Full path the entry maps to in the target tree
    pub target_path: PathBuf,
}

/// Which exclusion filter caused a skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreRule {
    /// The entry sits inside an ignored directory
    Directory,
    /// The file itself is listed
    File,
    /// The file's extension is listed
    Extension,
}

/// What the engine did with one entry. Handed to progress callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    /// A new directory was created in the target
    DirectoryCreated,
    /// The directory was already present in the target
    DirectoryExisted,
    /// The file was copied, possibly under a duplicate name
    Copied { destination: PathBuf },
    /// Nothing was written
    Skipped(SkipReason),
}

impl EntryOutcome {
    pub fn is_copy(&self) -> bool {
        matches!(self, EntryOutcome::Copied { .. })
    }
}

/// Why an entry was not written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    IgnoredDirectory,
    IgnoredFile,
    IgnoredExtension,
    DryRun,
    AlreadyExists,
    Stale,
}

impl From<IgnoreRule> for SkipReason {
    fn from(rule: IgnoreRule) -> Self {
        match rule {
            IgnoreRule::Directory => SkipReason::IgnoredDirectory,
            IgnoreRule::File => SkipReason::IgnoredFile,
            IgnoreRule::Extension => SkipReason::IgnoredExtension,
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::IgnoredDirectory => "in ignored directories list",
            SkipReason::IgnoredFile => "in ignored files list",
            SkipReason::IgnoredExtension => "extension is ignored",
            SkipReason::DryRun => "dry run",
            SkipReason::AlreadyExists => "already exists",
            SkipReason::Stale => "not modified within the freshness window",
        };
        f.write_str(text)
    }
}

/// Summary of a completed run.
///
/// Only built through `TransferResult::new`, which rejects negative inputs
/// instead of clamping them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferResult {
    /// Local wall time when the run finished
    pub completed_at: String,

    /// Files actually written to the target
    pub files_transferred: u64,

    /// Wall-clock duration of the run in seconds
    pub time_taken: f64,

    pub ignored_ext: Vec<String>,
    pub ignored_files: Vec<PathBuf>,
    pub ignored_directories: Vec<PathBuf>,

    pub overwrite: bool,
    pub overwrite_condition: OverwriteCondition,

    /// New directories created in the target
    pub directories_created: u64,

    /// Entries that were skipped for any reason
    pub entries_skipped: u64,

    pub dry_run: bool,
}

/// Counters accumulated by the engine during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    /// Signed so that a miscount surfaces as `ResultValidation` in
    /// `TransferResult::new` instead of wrapping around.
    pub files_transferred: i64,
    pub directories_created: u64,
    pub entries_skipped: u64,
}

impl TransferResult {
    /// Build the summary for `job`.
    ///
    /// # Errors
    /// Returns `EngineError::ResultValidation` if `time_taken` is negative or
    /// not a number, or if `counters.files_transferred` is negative.
    pub fn new(job: &BackupJob, time_taken: f64, counters: RunCounters) -> Result<Self> {
        if time_taken.is_nan() || time_taken < 0.0 {
            return Err(EngineError::ResultValidation {
                reason: format!("time taken cannot be negative (got {})", time_taken),
            });
        }
        if counters.files_transferred < 0 {
            return Err(EngineError::ResultValidation {
                reason: format!(
                    "number of files transferred cannot be negative (got {})",
                    counters.files_transferred
                ),
            });
        }

        Ok(TransferResult {
            completed_at: Local::now().format(COMPLETED_AT_FORMAT).to_string(),
            files_transferred: counters.files_transferred as u64,
            time_taken,
            ignored_ext: job.ignored_ext.clone(),
            ignored_files: job.ignored_files.clone(),
            ignored_directories: job.ignored_directories.clone(),
            overwrite: job.overwrite,
            overwrite_condition: job.overwrite_condition,
            directories_created: counters.directories_created,
            entries_skipped: counters.entries_skipped,
            dry_run: job.dry_run,
        })
    }

    /// Serialize the summary as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| EngineError::ResultValidation {
            reason: format!("summary is not representable as JSON: {}", e),
        })
    }
}
