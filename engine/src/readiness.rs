//! Pre-run checks.
//!
//! Everything here runs once, before the source tree is enumerated. A job
//! that fails these checks never touches the target.

use std::fs;
use std::path::Path;

use tracing::{debug, error};

use crate::error::{EngineError, Result};
use crate::model::{BackupJob, OverwriteCondition};

/// Outcome of `target_ready`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Blocked { reason: String },
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }
}

/// True iff both the source and the target are existing directories.
pub fn directories_exist(job: &BackupJob) -> bool {
    job.source.is_dir() && job.target.is_dir()
}

/// Check whether the target may receive files under the job's policy.
///
/// A non-empty target is accepted when overwrite is on, or when the
/// condition resolves conflicts per entry (`Ignore`, `Duplicate`).
///
/// # Errors
/// Returns `EngineError::Precondition` if the target cannot be listed.
pub fn target_ready(job: &BackupJob) -> Result<Readiness> {
    if job.overwrite {
        return Ok(Readiness::Ready);
    }

    if is_empty_dir(&job.target)? {
        return Ok(Readiness::Ready);
    }

    let readiness = match job.overwrite_condition {
        OverwriteCondition::Ignore | OverwriteCondition::Duplicate => Readiness::Ready,
        OverwriteCondition::TargetEmpty => Readiness::Blocked {
            reason: "target not empty and overwrite disabled".to_string(),
        },
        OverwriteCondition::RecentlyModified => Readiness::Blocked {
            reason: "target not empty and overwrite disabled \
                     (recently-modified requires overwrite)"
                .to_string(),
        },
    };
    Ok(readiness)
}

/// Run both checks, failing with a descriptive reason on the first problem.
pub fn ensure_ready(job: &BackupJob) -> Result<()> {
    if !directories_exist(job) {
        let reason = format!(
            "source or target directory does not exist (source: {}, target: {})",
            job.source.display(),
            job.target.display()
        );
        error!(job_id = %job.id, "{}", reason);
        return Err(EngineError::precondition(reason));
    }

    match target_ready(job)? {
        Readiness::Ready => {
            debug!(job_id = %job.id, "Target is ready");
            Ok(())
        }
        Readiness::Blocked { reason } => {
            error!(job_id = %job.id, target = %job.target.display(), "{}", reason);
            Err(EngineError::precondition(reason))
        }
    }
}

fn is_empty_dir(path: &Path) -> Result<bool> {
    let mut entries = fs::read_dir(path).map_err(|e| {
        EngineError::precondition(format!("cannot list target {}: {}", path.display(), e))
    })?;
    Ok(entries.next().is_none())
}
