//! Side-effecting capabilities the supervisor and gateway depend on.
//!
//! Both are injected as trait objects so tests can substitute fakes for real
//! process spawning and browser launches.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use tunebridge_core::BackendConfig;

/// Program, arguments and working directory used to start the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl LaunchCommand {
    pub fn from_config(config: &BackendConfig, working_dir: PathBuf) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            working_dir,
        }
    }
}

impl fmt::Display for LaunchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        write!(f, " (in {})", self.working_dir.display())
    }
}

/// Handle to a backend process started by us.
pub trait BackendProcess: Send {
    fn id(&self) -> u32;

    /// True once the process has exited (it is reaped if so).
    fn has_exited(&mut self) -> bool;

    /// Forcibly stops the process and waits for it.
    fn terminate(&mut self) -> io::Result<()>;
}

/// Starts the backend as a detached background process.
pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, command: &LaunchCommand) -> io::Result<Box<dyn BackendProcess>>;
}

/// Opens a URL in the user's default browser.
pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &str) -> io::Result<()>;
}

/// [`ProcessLauncher`] backed by `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn launch(&self, command: &LaunchCommand) -> io::Result<Box<dyn BackendProcess>> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(&command.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const DETACHED_PROCESS: u32 = 0x0000_0008;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            cmd.creation_flags(DETACHED_PROCESS | CREATE_NO_WINDOW);
        }

        let child = cmd.spawn()?;
        tracing::info!(pid = child.id(), command = %command, "backend process spawned");
        Ok(Box::new(child))
    }
}

impl BackendProcess for Child {
    fn id(&self) -> u32 {
        Child::id(self)
    }

    fn has_exited(&mut self) -> bool {
        !matches!(self.try_wait(), Ok(None))
    }

    fn terminate(&mut self) -> io::Result<()> {
        if let Ok(Some(_)) = self.try_wait() {
            return Ok(());
        }
        self.kill()?;
        self.wait().map(|_| ())
    }
}

/// [`UrlOpener`] backed by the `webbrowser` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserOpener;

impl UrlOpener for BrowserOpener {
    fn open(&self, url: &str) -> io::Result<()> {
        webbrowser::open(url)
    }
}
