//! Logging initialization for the backup CLI.
//!
//! Log records go to stderr (or a file) so the JSON summary on stdout stays
//! machine-readable. `RUST_LOG` overrides the default filter.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Configuration for the logging system.
pub struct LogConfig {
    /// Enable verbose logging (sets default level to DEBUG)
    pub verbose: bool,
    pub format: LogFormat,
    /// Append to this file instead of writing to stderr
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            format: LogFormat::Text,
            file: None,
        }
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    let default_level = if verbose { Level::DEBUG } else { Level::INFO };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = default_level.as_str().to_lowercase();
        EnvFilter::new(format!("backup={level},backup_engine={level}"))
    })
}

/// Install the global tracing subscriber. Call once, early in `main`.
pub fn init(config: LogConfig) -> Result<()> {
    let filter = env_filter(config.verbose);

    match config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let layer = fmt::layer().with_writer(Mutex::new(file)).with_ansi(false);
            match config.format {
                LogFormat::Json => tracing_subscriber::registry()
                    .with(filter)
                    .with(layer.json())
                    .try_init(),
                LogFormat::Text => tracing_subscriber::registry()
                    .with(filter)
                    .with(layer)
                    .try_init(),
            }
        }
        None => {
            let layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
            match config.format {
                LogFormat::Json => tracing_subscriber::registry()
                    .with(filter)
                    .with(layer.json())
                    .try_init(),
                LogFormat::Text => tracing_subscriber::registry()
                    .with(filter)
                    .with(layer)
                    .try_init(),
            }
        }
    }
    .context("Failed to install log subscriber")
}
