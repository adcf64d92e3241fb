use crate::paths::AppDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_config_version")]
    pub config_version: u32,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            backend: BackendConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Where the backend lives and how to reach and launch it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Working directory of the backend. Required before it can be launched.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// File that must exist in `directory` for the backend to count as installed.
    #[serde(default = "default_launch_artifact")]
    pub launch_artifact: String,
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_startup_timeout_ms")]
    pub startup_timeout_ms: u64,
    #[serde(default = "default_startup_poll_interval_ms")]
    pub startup_poll_interval_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            directory: None,
            base_url: default_base_url(),
            launch_artifact: default_launch_artifact(),
            program: default_program(),
            args: default_args(),
            request_timeout_secs: default_request_timeout_secs(),
            startup_timeout_ms: default_startup_timeout_ms(),
            startup_poll_interval_ms: default_startup_poll_interval_ms(),
        }
    }
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    pub fn startup_poll_interval(&self) -> Duration {
        Duration::from_millis(self.startup_poll_interval_ms)
    }

    /// Path of the launch artifact, when a directory is configured.
    pub fn artifact_path(&self) -> Option<PathBuf> {
        self.directory
            .as_deref()
            .map(|dir| dir.join(&self.launch_artifact))
    }

    /// Human-readable launch command, used in diagnostics.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let url = Url::parse(&self.base_url).map_err(|e| ValidationError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ValidationError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: format!("unsupported scheme {}", url.scheme()),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::ZeroDuration {
                field: "backend.request_timeout_secs",
            });
        }
        if self.startup_timeout_ms == 0 {
            return Err(ValidationError::ZeroDuration {
                field: "backend.startup_timeout_ms",
            });
        }
        if self.startup_poll_interval_ms == 0 {
            return Err(ValidationError::ZeroDuration {
                field: "backend.startup_poll_interval_ms",
            });
        }
        if self.program.trim().is_empty() {
            return Err(ValidationError::EmptyProgram);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
    #[serde(default = "default_max_log_files")]
    pub max_log_files: usize,
    /// Mirror log lines to stderr. Stdout stays reserved for command output.
    #[serde(default)]
    pub stderr: bool,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_log_files: default_max_log_files(),
            stderr: false,
            file_name: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("config validation failed: {0}")]
    Validation(ValidationError),
    #[error("failed to prepare configuration directories: {0}")]
    Directories(#[from] crate::paths::DirsError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unsupported config_version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("invalid backend.base_url {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },
    #[error("backend.program must not be empty")]
    EmptyProgram,
}

impl Config {
    pub fn load_or_default(dirs: &AppDirs) -> Result<Self, ConfigError> {
        dirs.ensure_exists()?;
        let path = Self::config_path(dirs);
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate().map_err(ConfigError::Validation)?;
        Ok(config)
    }

    pub fn config_path(dirs: &AppDirs) -> PathBuf {
        dirs.config_file()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.config_version != CURRENT_CONFIG_VERSION {
            return Err(ValidationError::UnsupportedVersion {
                found: self.config_version,
                expected: CURRENT_CONFIG_VERSION,
            });
        }
        self.backend.validate()
    }
}

fn default_config_version() -> u32 {
    CURRENT_CONFIG_VERSION
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".into()
}

fn default_launch_artifact() -> String {
    "main.py".into()
}

#[cfg(windows)]
fn default_program() -> String {
    // pythonw keeps a console window from flashing up.
    "pythonw".into()
}

#[cfg(not(windows))]
fn default_program() -> String {
    "python3".into()
}

fn default_args() -> Vec<String> {
    vec![default_launch_artifact()]
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_startup_timeout_ms() -> u64 {
    4_000
}

fn default_startup_poll_interval_ms() -> u64 {
    500
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_max_log_files() -> usize {
    7
}
