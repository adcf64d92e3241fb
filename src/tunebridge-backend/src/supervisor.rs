//! Keeps the backend process alive.
//!
//! [`BackendSupervisor::ensure_running`] is called before every catalog
//! operation. The whole probe, check, launch and wait sequence runs under one
//! mutex, so concurrent callers never spawn a second backend: a caller that
//! waited on the lock while another caller's start attempt was in flight
//! takes that attempt's outcome instead of starting its own.

use crate::http::HttpClient;
use crate::launcher::{BackendProcess, LaunchCommand, ProcessLauncher};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Instant;
use thiserror::Error;
use tunebridge_core::BackendConfig;

/// Cheap check that the backend accepts requests and answers sanely.
pub trait LivenessProbe: Send + Sync {
    fn is_alive(&self) -> bool;
}

impl LivenessProbe for HttpClient {
    fn is_alive(&self) -> bool {
        self.is_server_alive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    Unknown,
    Starting,
    Running,
    Failed,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SupervisorError {
    #[error("backend directory is not configured")]
    NotConfigured,
    #[error("backend not installed: {} not found", .path.display())]
    BackendNotInstalled { path: PathBuf },
    #[error(
        "failed to start backend with `{command}` (os error {}): {message}",
        .code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
    )]
    LaunchFailed {
        command: String,
        code: Option<i32>,
        message: String,
    },
    #[error("backend started with `{command}` but is not responding")]
    BackendUnreachable { command: String },
}

struct SupervisorInner {
    state: BackendState,
    /// Only set for a process we launched ourselves.
    process: Option<Box<dyn BackendProcess>>,
    last_outcome: Result<(), SupervisorError>,
}

pub struct BackendSupervisor {
    config: BackendConfig,
    probe: Arc<dyn LivenessProbe>,
    launcher: Box<dyn ProcessLauncher>,
    inner: Mutex<SupervisorInner>,
    attempts: AtomicU64,
}

impl BackendSupervisor {
    pub fn new(
        config: BackendConfig,
        probe: Arc<dyn LivenessProbe>,
        launcher: Box<dyn ProcessLauncher>,
    ) -> Self {
        Self {
            config,
            probe,
            launcher,
            inner: Mutex::new(SupervisorInner {
                state: BackendState::Unknown,
                process: None,
                last_outcome: Ok(()),
            }),
            attempts: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> BackendState {
        self.lock().state
    }

    /// Whether a backend process launched by this supervisor is held.
    pub fn owns_process(&self) -> bool {
        self.lock().process.is_some()
    }

    /// Makes sure the backend answers, starting it when it does not.
    ///
    /// `Failed` is not sticky: every call after a failure retries the full
    /// sequence.
    pub fn ensure_running(&self) -> Result<(), SupervisorError> {
        let seen = self.attempts.load(Ordering::Acquire);
        let mut inner = self.lock();
        if self.attempts.load(Ordering::Acquire) != seen {
            tracing::debug!("reusing outcome of concurrent backend check");
            return inner.last_outcome.clone();
        }

        let outcome = if self.probe.is_alive() {
            if inner.state != BackendState::Running {
                tracing::info!(
                    owned = inner.process.is_some(),
                    "backend is responding"
                );
            }
            Ok(())
        } else {
            self.start(&mut inner)
        };

        inner.state = match outcome {
            Ok(()) => BackendState::Running,
            Err(_) => BackendState::Failed,
        };
        inner.last_outcome = outcome.clone();
        self.attempts.fetch_add(1, Ordering::Release);
        outcome
    }

    /// Terminates the backend process if, and only if, we launched it.
    pub fn shutdown(&self) {
        let mut inner = self.lock();
        if let Some(mut process) = inner.process.take() {
            let pid = process.id();
            match process.terminate() {
                Ok(()) => tracing::info!(pid, "backend process terminated"),
                Err(e) => tracing::warn!(pid, error = %e, "failed to terminate backend process"),
            }
        }
        inner.state = BackendState::Unknown;
    }

    /// Stops tracking the owned process without terminating it, so the
    /// backend outlives this supervisor. Returns its pid.
    pub fn release(&self) -> Option<u32> {
        let process = self.lock().process.take()?;
        let pid = process.id();
        tracing::info!(pid, "backend process released");
        Some(pid)
    }

    fn start(&self, inner: &mut SupervisorInner) -> Result<(), SupervisorError> {
        inner.state = BackendState::Starting;
        tracing::info!("backend not responding, attempting to start it");

        if let Some(mut process) = inner.process.take() {
            let pid = process.id();
            if process.has_exited() {
                tracing::warn!(pid, "previously launched backend has exited");
            } else {
                tracing::warn!(pid, "previously launched backend is unresponsive, terminating");
                if let Err(e) = process.terminate() {
                    tracing::warn!(pid, error = %e, "failed to terminate unresponsive backend");
                }
            }
        }

        let (Some(directory), Some(artifact)) =
            (self.config.directory.clone(), self.config.artifact_path())
        else {
            tracing::error!("backend directory is not configured");
            return Err(SupervisorError::NotConfigured);
        };
        if !artifact.is_file() {
            tracing::error!(path = %artifact.display(), "backend not installed");
            return Err(SupervisorError::BackendNotInstalled { path: artifact });
        }

        let command = LaunchCommand::from_config(&self.config, directory);
        tracing::info!(command = %command, "launching backend");
        let mut process = self.launcher.launch(&command).map_err(|e| {
            tracing::error!(command = %command, code = ?e.raw_os_error(), error = %e, "failed to start backend process");
            SupervisorError::LaunchFailed {
                command: command.to_string(),
                code: e.raw_os_error(),
                message: e.to_string(),
            }
        })?;

        let ready = self.wait_until_ready(process.as_mut());
        let exited = process.has_exited();
        if !exited {
            inner.process = Some(process);
        }
        if ready {
            tracing::info!("backend started");
            Ok(())
        } else {
            tracing::error!(command = %command, exited, "backend process started but server not responding");
            Err(SupervisorError::BackendUnreachable {
                command: command.to_string(),
            })
        }
    }

    /// Probes until the backend answers, the process dies, or the startup
    /// timeout elapses.
    fn wait_until_ready(&self, process: &mut dyn BackendProcess) -> bool {
        let deadline = Instant::now() + self.config.startup_timeout();
        let interval = self.config.startup_poll_interval();
        loop {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(interval.min(deadline - now));
            if process.has_exited() {
                tracing::warn!(pid = process.id(), "backend process exited during startup");
                return false;
            }
            if self.probe.is_alive() {
                return true;
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, SupervisorInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for BackendSupervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
