//! # Backup Engine - Directory Backup Library
//!
//! A headless engine that copies a source directory tree into a target
//! directory. Designed as the foundation for the `backup` CLI and any other
//! front end (cron wrappers, GUIs).
//!
//! ## Overview
//!
//! The engine provides:
//! - A readiness gate that refuses to start against a missing or occupied
//!   target before anything is written
//! - Lazy, depth-first enumeration of the source tree (parents first)
//! - A pure per-entry policy: create, skip, overwrite, keep existing,
//!   duplicate, or copy only recently modified files
//! - Exclusion filters for directories, files and extensions
//! - Dry runs that log every decision without touching the target
//! - Progress reporting via callbacks (decoupled from any display)
//! - A serializable run summary
//!
//! ## Basic Usage
//!
//! ```no_run
//! use backup_engine::{create_job, run_job, JobConfig, OverwriteCondition};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = JobConfig::new("~/Documents", "/mnt/backup/documents");
//! config.overwrite_condition = OverwriteCondition::Duplicate;
//! config.ignored_ext = vec![".tmp".to_string()];
//!
//! let job = create_job(config)?;
//! let result = run_job(&job, None, None)?;
//!
//! println!("{}", result.to_json()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **model**: Core data structures (BackupJob, SourceEntry, TransferResult)
//! - **config**: Job configuration and TOML job files
//! - **error**: Error types
//! - **paths**: Path resolution, relative paths, duplicate naming
//! - **readiness**: Pre-run checks
//! - **fs_ops**: Enumeration, copying and directory pruning
//! - **policy**: Per-entry decisions
//! - **job**: Job orchestration (create, run)
//! - **progress**: Progress callback trait

pub mod config;
pub mod error;
pub mod fs_ops;
pub mod job;
pub mod model;
pub mod paths;
pub mod policy;
pub mod progress;
pub mod readiness;

// Re-export main types and functions
pub use config::JobConfig;
pub use error::EngineError;
pub use fs_ops::{empty_directory, TreeEnumerator};
pub use job::{create_job, run_job};
pub use model::{
    BackupJob, EntryOutcome, IgnoreRule, OverwriteCondition, SkipReason, SourceEntry,
    TransferResult,
};
pub use policy::{decide, Action, EntryFacts};
pub use progress::ProgressCallback;
pub use readiness::{directories_exist, ensure_ready, target_ready, Readiness};
