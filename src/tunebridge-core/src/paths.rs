use crate::{APP_AUTHOR, APP_NAME, APP_QUALIFIER};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable that relocates all Tunebridge state under one root.
pub const HOME_ENV: &str = "TUNEBRIDGE_HOME";

const CONFIG_FILE: &str = "config.toml";

/// Where the config file and the rolling logs live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDirs {
    config_dir: PathBuf,
    log_dir: PathBuf,
}

impl AppDirs {
    /// Platform directories, unless `TUNEBRIDGE_HOME` points elsewhere.
    pub fn discover() -> Result<Self, DirsError> {
        match std::env::var_os(HOME_ENV) {
            Some(home) if !home.is_empty() => Ok(Self::rooted_at(PathBuf::from(home))),
            _ => Self::platform(),
        }
    }

    fn platform() -> Result<Self, DirsError> {
        let project = ProjectDirs::from(APP_QUALIFIER, APP_AUTHOR, APP_NAME)
            .ok_or(DirsError::NoHomeDirectory)?;
        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
            log_dir: project.data_local_dir().join("logs"),
        })
    }

    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            config_dir: root.join("config"),
            log_dir: root.join("logs"),
        }
    }

    pub fn ensure_exists(&self) -> Result<(), DirsError> {
        [&self.config_dir, &self.log_dir]
            .into_iter()
            .try_for_each(|dir| {
                std::fs::create_dir_all(dir).map_err(|source| DirsError::Create {
                    path: dir.clone(),
                    source,
                })
            })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

#[derive(Debug, Error)]
pub enum DirsError {
    #[error("no home directory found; set {HOME_ENV} to choose a location")]
    NoHomeDirectory,
    #[error("failed to create directory {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
}
