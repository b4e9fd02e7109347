//! Job orchestration module.
//!
//! This module provides the job lifecycle:
//! - Creating a job from a `JobConfig` (path resolution, validation)
//! - Running a job: readiness gate, enumeration, per-entry decision and
//!   execution, summary

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::{debug, info, info_span};
use uuid::Uuid;

use crate::config::JobConfig;
use crate::error::{EngineError, Result};
use crate::fs_ops::{self, TreeEnumerator};
use crate::model::{BackupJob, EntryOutcome, RunCounters, SkipReason, SourceEntry, TransferResult};
use crate::paths;
use crate::policy::{self, Action, EntryFacts};
use crate::progress::ProgressCallback;
use crate::readiness;

/// Create a new backup job.
///
/// Resolves the source and target paths (expanding `~`). Nothing on disk is
/// checked here; existence is verified by the readiness gate when the job
/// runs.
///
/// # Errors
/// Returns `EngineError::Configuration` if the source or target is not a
/// usable path.
pub fn create_job(config: JobConfig) -> Result<BackupJob> {
    let source = paths::resolve(&config.source).map_err(|e| with_field("source", e))?;
    let target = paths::resolve(&config.target).map_err(|e| with_field("target", e))?;

    Ok(BackupJob {
        id: Uuid::new_v4(),
        source,
        target,
        overwrite: config.overwrite,
        overwrite_condition: config.overwrite_condition,
        ignored_ext: config.ignored_ext,
        ignored_files: config.ignored_files,
        ignored_directories: config.ignored_directories,
        dry_run: config.dry_run,
        recent_window_hours: config.recent_window_hours,
    })
}

fn with_field(field: &str, err: EngineError) -> EngineError {
    match err {
        EngineError::Configuration { reason } => EngineError::Configuration {
            reason: format!("{}: {}", field, reason),
        },
        other => other,
    }
}

/// Run a job, copying the source tree into the target.
///
/// Entries are processed strictly in enumeration order, one at a time.
/// `progress.on_entry` is called once per entry whatever the outcome.
/// When `cancel` is set, it is checked before each entry; a set flag stops
/// the run with `EngineError::Cancelled`.
///
/// # Errors
/// Readiness failures abort before any enumeration. A filesystem error on
/// any entry aborts the rest of the run; nothing is rolled back and no
/// summary is produced.
pub fn run_job(
    job: &BackupJob,
    progress: Option<&dyn ProgressCallback>,
    cancel: Option<&AtomicBool>,
) -> Result<TransferResult> {
    let span = info_span!("backup_run", job_id = %job.id);
    let _guard = span.enter();

    info!(
        source = %job.source.display(),
        target = %job.target.display(),
        overwrite = job.overwrite,
        condition = %job.overwrite_condition,
        dry_run = job.dry_run,
        "Transfer process started"
    );
    let start = Instant::now();

    readiness::ensure_ready(job)?;

    if let Some(callback) = progress {
        callback.on_run_started(job);
    }

    let mut counters = RunCounters::default();
    for (index, entry) in TreeEnumerator::new(&job.source, &job.target).enumerate() {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            info!(processed = index, "Backup cancelled");
            return Err(EngineError::Cancelled);
        }

        let entry = entry?;
        let outcome = process_entry(job, &entry)?;

        match &outcome {
            EntryOutcome::DirectoryCreated => counters.directories_created += 1,
            EntryOutcome::DirectoryExisted => {}
            EntryOutcome::Copied { .. } => counters.files_transferred += 1,
            EntryOutcome::Skipped(_) => counters.entries_skipped += 1,
        }

        if let Some(callback) = progress {
            callback.on_entry(index, &entry, &outcome);
        }
    }

    let time_taken = start.elapsed().as_secs_f64();
    let result = TransferResult::new(job, time_taken, counters)?;

    info!(
        files_transferred = result.files_transferred,
        directories_created = result.directories_created,
        entries_skipped = result.entries_skipped,
        "Backup job completed in {:.4} seconds",
        time_taken
    );

    if let Some(callback) = progress {
        callback.on_run_completed(&result);
    }

    Ok(result)
}

/// Decide and execute one entry.
fn process_entry(job: &BackupJob, entry: &SourceEntry) -> Result<EntryOutcome> {
    let facts = gather_facts(job, entry)?;
    let action = policy::decide(entry, job, &facts);
    execute(job, entry, action)
}

fn gather_facts(job: &BackupJob, entry: &SourceEntry) -> Result<EntryFacts> {
    if entry.is_directory || job.dry_run {
        return Ok(EntryFacts::default());
    }

    let modified_age = if policy::needs_age(job) {
        Some(fs_ops::modified_age(&entry.source_path)?)
    } else {
        None
    };

    Ok(EntryFacts {
        // symlink_metadata so a dangling link still counts as occupying the name
        target_exists: entry.target_path.symlink_metadata().is_ok(),
        modified_age,
    })
}

fn execute(job: &BackupJob, entry: &SourceEntry, action: Action) -> Result<EntryOutcome> {
    let source = &entry.source_path;
    let target = &entry.target_path;

    let outcome = match action {
        Action::CreateDir => {
            if fs_ops::create_dir(target)? {
                info!(path = %target.display(), "New directory created");
                EntryOutcome::DirectoryCreated
            } else {
                debug!(path = %target.display(), "Directory already exists");
                EntryOutcome::DirectoryExisted
            }
        }
        Action::SkipIgnoredDir => {
            info!(path = %source.display(), "Directory not created as in ignored directories list");
            EntryOutcome::Skipped(SkipReason::IgnoredDirectory)
        }
        Action::SkipDryRunDir => {
            info!(path = %target.display(), "DRY RUN: New directory would be created");
            EntryOutcome::Skipped(SkipReason::DryRun)
        }
        Action::SkipDryRunFile => {
            info!(path = %target.display(), "DRY RUN: File would be copied");
            EntryOutcome::Skipped(SkipReason::DryRun)
        }
        Action::SkipIgnoredFile(rule) => {
            let reason = SkipReason::from(rule);
            info!(path = %source.display(), reason = %reason, "File not copied");
            EntryOutcome::Skipped(reason)
        }
        Action::CopyPlain | Action::CopyIfRecentlyModified => {
            let bytes = fs_ops::copy_file_with_metadata(source, target)?;
            debug!(path = %target.display(), bytes, "File copied");
            EntryOutcome::Copied {
                destination: target.clone(),
            }
        }
        Action::CopyIfAbsent => match fs_ops::copy_file_if_absent(source, target)? {
            Some(bytes) => {
                debug!(path = %target.display(), bytes, "File copied");
                EntryOutcome::Copied {
                    destination: target.clone(),
                }
            }
            None => skip_existing(source),
        },
        Action::SkipExisting => skip_existing(source),
        Action::CopyDuplicate => {
            let (destination, bytes) = fs_ops::copy_file_as_duplicate(source, target)?;
            info!(
                path = %source.display(),
                destination = %destination.display(),
                bytes,
                "Target exists, copied as duplicate"
            );
            EntryOutcome::Copied { destination }
        }
        Action::SkipStaleFile => {
            info!(
                path = %source.display(),
                window_hours = job.recent_window_hours,
                "File not overwritten because not updated within the freshness window"
            );
            EntryOutcome::Skipped(SkipReason::Stale)
        }
    };

    Ok(outcome)
}

fn skip_existing(source: &std::path::Path) -> EntryOutcome {
    info!(path = %source.display(), "File not overwritten as it already exists");
    EntryOutcome::Skipped(SkipReason::AlreadyExists)
}
