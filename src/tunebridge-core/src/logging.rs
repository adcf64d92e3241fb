//! Process-wide tracing setup.
//!
//! Records go to a daily rolling file under [`AppDirs::log_dir`]. stdout is
//! left alone because the CLI prints results there; `logging.stderr = true`
//! mirrors records to stderr as well.

use crate::{config::LoggingConfig, paths::AppDirs};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, EnvFilter};

/// Overrides `logging.level` with a full filter directive, e.g.
/// `TUNEBRIDGE_LOG=tunebridge_backend=debug,info`.
pub const FILTER_ENV: &str = "TUNEBRIDGE_LOG";

const DEFAULT_LOG_FILE: &str = "tunebridge.log";

/// Flushes pending records when dropped; hold it for the life of `main`.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

pub fn init_logging(config: &LoggingConfig, dirs: &AppDirs) -> Result<LoggingGuard, LoggingError> {
    let log_dir = dirs.log_dir();
    fs::create_dir_all(log_dir).map_err(|source| LoggingError::LogDirectory {
        path: log_dir.to_path_buf(),
        source,
    })?;

    let directive = std::env::var(FILTER_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| config.level.as_filter_directive().to_string());
    let filter = EnvFilter::try_new(&directive).map_err(|source| LoggingError::Filter {
        directive: directive.clone(),
        source,
    })?;

    let file_name = config.file_name.as_deref().unwrap_or(DEFAULT_LOG_FILE);
    prune_logs(log_dir, file_name, config.max_log_files.max(1))?;

    let (file, file_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, file_name));
    let writer = if config.stderr {
        BoxMakeWriter::new(std::io::stderr.and(file))
    } else {
        BoxMakeWriter::new(file)
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(false)
        .with_writer(writer)
        .try_init()
        .map_err(LoggingError::Install)?;

    tracing::debug!(dir = %log_dir.display(), %directive, "logging initialised");
    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Deletes the oldest rotated files named after `file_name` so at most
/// `keep` remain.
fn prune_logs(dir: &Path, file_name: &str, keep: usize) -> Result<(), LoggingError> {
    let listing = fs::read_dir(dir).map_err(|source| LoggingError::LogDirectory {
        path: dir.to_path_buf(),
        source,
    })?;
    let candidates = listing
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(file_name))
        .filter_map(|entry| {
            let modified = entry.metadata().and_then(|m| m.modified()).ok()?;
            Some((entry.path(), modified))
        })
        .collect();

    for path in expired(candidates, keep) {
        fs::remove_file(&path).map_err(|source| LoggingError::Prune { path, source })?;
    }
    Ok(())
}

/// Everything but the `keep` newest files, oldest first.
fn expired(mut files: Vec<(PathBuf, SystemTime)>, keep: usize) -> Vec<PathBuf> {
    if files.len() <= keep {
        return Vec::new();
    }
    files.sort_by_key(|(_, modified)| *modified);
    let excess = files.len() - keep;
    files.into_iter().take(excess).map(|(path, _)| path).collect()
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("log directory {path} unusable: {source}")]
    LogDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid log filter {directive:?}: {source}")]
    Filter {
        directive: String,
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("a global tracing subscriber is already installed: {0}")]
    Install(Box<dyn std::error::Error + Send + Sync>),
    #[error("failed to remove old log file {path}: {source}")]
    Prune {
        path: PathBuf,
        source: std::io::Error,
    },
}
