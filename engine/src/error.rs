//! Error types for the backup engine.
//!
//! `EngineError` covers everything that stops a run: bad configuration,
//! failed preconditions, contract violations while building a result, and
//! filesystem failures on a single entry. Skips are never errors; they are
//! policy decisions reported through `EntryOutcome`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building or running a backup job.
///
/// Configuration and precondition errors are raised before any enumeration
/// or mutation happens, so a run that fails with one of them leaves the
/// target untouched.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Source/target are not usable paths, or the job file is malformed
    #[error("Invalid configuration: {reason}")]
    Configuration { reason: String },

    /// Source/target missing, or the target is not ready for this policy
    #[error("Backup cannot start: {reason}")]
    Precondition { reason: String },

    /// A result was built from a negative duration or file count
    #[error("Invalid transfer result: {reason}")]
    ResultValidation { reason: String },

    /// Failed to walk the source tree
    #[error("Failed to enumerate directory: {}", path.display())]
    EnumerationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to create a directory in the target
    #[error("Failed to create directory: {}", path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read from a source file
    #[error("Failed to read file: {}", path.display())]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write a destination file
    #[error("Failed to write file: {}", path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to remove an entry while emptying a directory
    #[error("Failed to remove: {}", path.display())]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The caller asked the run to stop between entries
    #[error("Backup cancelled")]
    Cancelled,
}

impl EngineError {
    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub(crate) fn precondition(reason: impl Into<String>) -> Self {
        Self::Precondition {
            reason: reason.into(),
        }
    }

    /// True for errors raised before the run touched the filesystem.
    pub fn is_pre_run(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::Precondition { .. })
    }
}

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, EngineError>;
