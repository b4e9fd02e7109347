//! Progress reporting trait.
//!
//! This module defines the ProgressCallback trait, which decouples the
//! backup engine from any specific display (progress bar, log, GUI).

use crate::model::{BackupJob, EntryOutcome, SourceEntry, TransferResult};

/// Trait for receiving progress updates from a backup run.
///
/// All methods are called synchronously on the thread running the job.
/// Only `on_entry` is required.
pub trait ProgressCallback {
    /// Called after the readiness checks pass, before the first entry.
    fn on_run_started(&self, _job: &BackupJob) {}

    /// Called exactly once for every enumerated entry, whatever the outcome.
    ///
    /// `index` counts entries from zero in enumeration order.
    fn on_entry(&self, index: usize, entry: &SourceEntry, outcome: &EntryOutcome);

    /// Called once the summary has been built.
    fn on_run_completed(&self, _result: &TransferResult) {}
}

impl<F> ProgressCallback for F
where
    F: Fn(usize, &SourceEntry, &EntryOutcome),
{
    fn on_entry(&self, index: usize, entry: &SourceEntry, outcome: &EntryOutcome) {
        self(index, entry, outcome)
    }
}
