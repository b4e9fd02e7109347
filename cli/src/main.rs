//! backup - Command-line interface for the backup engine.
//!
//! Runs a backup job described by flags or a TOML job file, shows progress
//! on stderr and prints the run summary as JSON on stdout.

mod logging;

use std::cell::Cell;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use backup_engine::{
    create_job, empty_directory, run_job, BackupJob, EngineError, EntryOutcome, JobConfig,
    OverwriteCondition, ProgressCallback, SourceEntry, TransferResult, TreeEnumerator,
};
use clap::{Args, Parser, Subcommand};
use logging::{LogConfig, LogFormat};

/// backup - copy a directory tree into a backup directory
#[derive(Parser, Debug)]
#[command(name = "backup")]
#[command(version)]
#[command(about = "Back up a directory tree with overwrite policies, filters and dry runs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Log record format
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    /// Append log records to this file instead of stderr
    #[arg(long, value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy the source tree into the target
    Run(RunArgs),
    /// Remove everything inside a directory, keeping the directory itself
    Empty {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// TOML job file; flags below override its values
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Source directory
    #[arg(long, value_name = "PATH")]
    src: Option<PathBuf>,

    /// Target directory
    #[arg(long, value_name = "PATH")]
    dst: Option<PathBuf>,

    /// Replace files that already exist in the target
    #[arg(long)]
    overwrite: bool,

    /// Overwrite condition: target-empty, ignore, duplicate, or recently-modified
    #[arg(long, value_name = "CONDITION")]
    condition: Option<String>,

    /// Extension to skip (repeatable), e.g. --ignore-ext .tmp
    #[arg(long = "ignore-ext", value_name = "EXT")]
    ignored_ext: Vec<String>,

    /// File to skip, relative to the source or as a full path (repeatable)
    #[arg(long = "ignore-file", value_name = "PATH")]
    ignored_files: Vec<PathBuf>,

    /// Directory to skip, relative to the source or as a full path (repeatable)
    #[arg(long = "ignore-dir", value_name = "PATH")]
    ignored_directories: Vec<PathBuf>,

    /// Log what would happen without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Freshness window in hours for the recently-modified condition
    #[arg(long, value_name = "HOURS")]
    recent_hours: Option<u64>,

    /// Do not draw the progress bar
    #[arg(long)]
    quiet: bool,
}

/// CLI implementation of ProgressCallback for displaying backup progress
struct CliProgress {
    verbose: bool,
    /// Counted in `on_run_started`, once the readiness gate has passed
    total_entries: Cell<usize>,
    start_time: Instant,
    last_progress_update: Cell<Option<Instant>>,
}

impl CliProgress {
    const REDRAW_INTERVAL: Duration = Duration::from_millis(200);

    fn new(verbose: bool) -> Self {
        CliProgress {
            verbose,
            total_entries: Cell::new(0),
            start_time: Instant::now(),
            last_progress_update: Cell::new(None),
        }
    }

    fn format_duration(elapsed: Duration) -> String {
        let secs = elapsed.as_secs();
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        let secs = secs % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, mins, secs)
        } else if mins > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}s", secs)
        }
    }

    fn print_progress_bar(percent: u32) -> String {
        let filled = (percent.min(100) / 5) as usize;
        let empty = 20 - filled;
        format!("[{}{}] {}%", "=".repeat(filled), " ".repeat(empty), percent)
    }

    fn describe(outcome: &EntryOutcome) -> String {
        match outcome {
            EntryOutcome::DirectoryCreated => "Created".to_string(),
            EntryOutcome::DirectoryExisted => "Exists".to_string(),
            EntryOutcome::Copied { destination } => format!("Copied -> {}", destination.display()),
            EntryOutcome::Skipped(reason) => format!("Skipped ({})", reason),
        }
    }
}

impl ProgressCallback for CliProgress {
    fn on_run_started(&self, job: &BackupJob) {
        let total = TreeEnumerator::new(&job.source, &job.target)
            .filter(|entry| entry.is_ok())
            .count();
        self.total_entries.set(total);

        eprintln!("Preparing backup...");
        eprintln!("  Source: {}", job.source.display());
        eprintln!("  Target: {}", job.target.display());
        eprintln!(
            "  Overwrite: {} ({})",
            job.overwrite, job.overwrite_condition
        );
        if job.dry_run {
            eprintln!("  DRY RUN: nothing will be written");
        }
        eprintln!("  Total: {} items", total);
        eprintln!();
    }

    fn on_entry(&self, index: usize, entry: &SourceEntry, outcome: &EntryOutcome) {
        if self.verbose {
            eprintln!(
                "[{:4}] {}: {}",
                index,
                Self::describe(outcome),
                entry.relative_path.display()
            );
            return;
        }

        let done = index + 1;
        let total_entries = self.total_entries.get();
        let is_last = done >= total_entries;
        let throttled = self
            .last_progress_update
            .get()
            .is_some_and(|last| last.elapsed() < Self::REDRAW_INTERVAL);
        if throttled && !is_last {
            return;
        }
        self.last_progress_update.set(Some(Instant::now()));

        let total = total_entries.max(1);
        let percent = (done as f64 / total as f64 * 100.0) as u32;
        eprint!(
            "\rProgress: {} | {}/{} items",
            Self::print_progress_bar(percent),
            done,
            total_entries
        );
        let _ = std::io::Write::flush(&mut std::io::stderr());
    }

    fn on_run_completed(&self, result: &TransferResult) {
        eprintln!();
        eprintln!("Backup complete!");
        eprintln!(
            "Summary: {} files copied, {} directories created, {} skipped",
            result.files_transferred, result.directories_created, result.entries_skipped
        );
        eprintln!("Elapsed: {}", Self::format_duration(self.start_time.elapsed()));
    }
}

/// Parse arguments, set up logging, then dispatch
fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig {
        verbose: cli.verbose,
        format: cli.log_format,
        file: cli.log_file.clone(),
    };
    if let Err(e) = logging::init(log_config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(2);
    }

    let exit_code = match run_cli(&cli) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            if e.downcast_ref::<EngineError>().is_some_and(EngineError::is_pre_run) {
                eprintln!("Nothing was copied.");
            }
            2
        }
    };

    std::process::exit(exit_code);
}

/// Main CLI logic - separated for testability
fn run_cli(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Run(args) => {
            let result = run_backup(args, cli.verbose)?;
            println!("{}", result.to_json()?);
            Ok(())
        }
        Commands::Empty { dir } => {
            let removed = empty_directory(dir)?;
            eprintln!("Removed {} entries from {}", removed, dir.display());
            Ok(())
        }
    }
}

fn run_backup(args: &RunArgs, verbose: bool) -> Result<TransferResult> {
    let config = build_config(args)?;
    let job = create_job(config)?;

    let result = if args.quiet {
        run_job(&job, None, None)?
    } else {
        let progress = CliProgress::new(verbose);
        run_job(&job, Some(&progress), None)?
    };

    Ok(result)
}

/// Merge the optional job file with command-line flags
fn build_config(args: &RunArgs) -> Result<JobConfig> {
    let mut config = match &args.config {
        Some(path) => JobConfig::load(path)
            .with_context(|| format!("Failed to load job file {}", path.display()))?,
        None => {
            let (Some(src), Some(dst)) = (&args.src, &args.dst) else {
                bail!("--src and --dst are required unless --config is given");
            };
            JobConfig::new(src, dst)
        }
    };

    if let Some(src) = &args.src {
        config.source = src.clone();
    }
    if let Some(dst) = &args.dst {
        config.target = dst.clone();
    }
    if args.overwrite {
        config.overwrite = true;
    }
    if let Some(condition) = &args.condition {
        config.overwrite_condition = condition.parse::<OverwriteCondition>()?;
    }
    if args.dry_run {
        config.dry_run = true;
    }
    if let Some(hours) = args.recent_hours {
        config.recent_window_hours = hours;
    }
    config.ignored_ext.extend(args.ignored_ext.iter().cloned());
    config.ignored_files.extend(args.ignored_files.iter().cloned());
    config
        .ignored_directories
        .extend(args.ignored_directories.iter().cloned());

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args_for(src: &TempDir, dst: &TempDir) -> RunArgs {
        RunArgs {
            src: Some(src.path().to_path_buf()),
            dst: Some(dst.path().to_path_buf()),
            quiet: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_cli_parses_run_flags() {
        let cli = Cli::try_parse_from([
            "backup",
            "--verbose",
            "run",
            "--src",
            "/a",
            "--dst",
            "/b",
            "--condition",
            "duplicate",
            "--ignore-ext",
            ".tmp",
            "--ignore-ext",
            "log",
            "--dry-run",
        ])
        .expect("valid arguments");

        assert!(cli.verbose);
        let Commands::Run(args) = cli.command else {
            panic!("expected run subcommand");
        };
        let config = build_config(&args).expect("valid config");
        assert_eq!(config.source, PathBuf::from("/a"));
        assert_eq!(config.overwrite_condition, OverwriteCondition::Duplicate);
        assert_eq!(config.ignored_ext, vec![".tmp".to_string(), "log".to_string()]);
        assert!(config.dry_run);
    }

    #[test]
    fn test_cli_with_valid_directories() {
        let src_dir = TempDir::new().expect("Failed to create temp dir");
        let dst_dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(src_dir.path().join("test.txt"), "hello").expect("Failed to write file");

        let result = run_backup(&args_for(&src_dir, &dst_dir), false).expect("backup should succeed");
        assert_eq!(result.files_transferred, 1);
        assert_eq!(
            std::fs::read_to_string(dst_dir.path().join("test.txt")).unwrap(),
            "hello"
        );
    }

    #[test]
    fn test_cli_with_progress_display() {
        let src_dir = TempDir::new().expect("Failed to create temp dir");
        let dst_dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(src_dir.path().join("test.txt"), "hello").expect("Failed to write file");

        let args = RunArgs {
            quiet: false,
            ..args_for(&src_dir, &dst_dir)
        };
        let result = run_backup(&args, true).expect("backup should succeed");
        assert_eq!(result.files_transferred, 1);
    }

    #[test]
    fn test_cli_rejects_missing_source() {
        let dst_dir = TempDir::new().expect("Failed to create temp dir");
        let args = RunArgs {
            src: Some(PathBuf::from("/nonexistent/path")),
            dst: Some(dst_dir.path().to_path_buf()),
            quiet: true,
            ..Default::default()
        };

        let err = run_backup(&args, false).unwrap_err();
        let engine_err = err.downcast_ref::<EngineError>().expect("engine error");
        assert!(matches!(engine_err, EngineError::Precondition { .. }));
    }

    #[test]
    fn test_cli_requires_paths_without_config() {
        let args = RunArgs::default();
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn test_cli_rejects_invalid_condition() {
        let src_dir = TempDir::new().expect("Failed to create temp dir");
        let dst_dir = TempDir::new().expect("Failed to create temp dir");
        let args = RunArgs {
            condition: Some("sometimes".to_string()),
            ..args_for(&src_dir, &dst_dir)
        };
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn test_cli_flags_override_job_file() {
        let src_dir = TempDir::new().expect("Failed to create temp dir");
        let dst_dir = TempDir::new().expect("Failed to create temp dir");
        let job_file = dst_dir.path().join("job.toml");
        std::fs::write(
            &job_file,
            "source = \"/from/file\"\ntarget = \"/to/file\"\nignored_ext = [\".tmp\"]\n",
        )
        .expect("Failed to write job file");

        let args = RunArgs {
            config: Some(job_file),
            src: Some(src_dir.path().to_path_buf()),
            overwrite: true,
            ignored_ext: vec![".bak".to_string()],
            ..Default::default()
        };

        let config = build_config(&args).expect("valid config");
        assert_eq!(config.source, src_dir.path());
        assert_eq!(config.target, PathBuf::from("/to/file"));
        assert!(config.overwrite);
        assert_eq!(config.ignored_ext, vec![".tmp".to_string(), ".bak".to_string()]);
    }

    #[test]
    fn test_cli_empty_directory() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/file.txt"), "x").unwrap();

        let cli = Cli {
            command: Commands::Empty {
                dir: dir.path().to_path_buf(),
            },
            verbose: false,
            log_format: LogFormat::Text,
            log_file: None,
        };
        run_cli(&cli).expect("empty should succeed");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_progress_total_counted_at_run_start() {
        let src_dir = TempDir::new().expect("Failed to create temp dir");
        let dst_dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::create_dir(src_dir.path().join("sub")).unwrap();
        std::fs::write(src_dir.path().join("sub/a.txt"), "a").unwrap();
        std::fs::write(src_dir.path().join("b.txt"), "b").unwrap();

        let job = create_job(JobConfig::new(src_dir.path(), dst_dir.path())).expect("valid job");
        let progress = CliProgress::new(false);
        assert_eq!(progress.total_entries.get(), 0);

        progress.on_run_started(&job);
        assert_eq!(progress.total_entries.get(), 3);
    }

    #[test]
    fn test_missing_source_fails_before_counting() {
        let dst_dir = TempDir::new().expect("Failed to create temp dir");
        let job = create_job(JobConfig::new("/nonexistent/path", dst_dir.path())).expect("valid job");
        let progress = CliProgress::new(false);

        let err = run_job(&job, Some(&progress), None).unwrap_err();
        assert!(matches!(err, EngineError::Precondition { .. }));
        assert_eq!(progress.total_entries.get(), 0);
    }

    #[test]
    fn test_progress_bar_rendering() {
        assert_eq!(CliProgress::print_progress_bar(0), "[                    ] 0%");
        assert_eq!(CliProgress::print_progress_bar(50), "[==========          ] 50%");
        assert_eq!(CliProgress::format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }
}
