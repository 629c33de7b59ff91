use std::process::{ExitStatus, Stdio};

use slog_scope::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout};

use crate::command::{spawn_child, CommandInvocation};
use crate::error::ConductorError;

/// Lifecycle state of a supervised process. Transitions are one-directional:
/// `NotStarted → Running → Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    NotStarted,
    Running,
    Terminated,
}

/// How a supervised process's output is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Output is discarded; `start` returns once the daemon is launched.
    #[default]
    Suppressed,
    /// Stdout is handed to the caller as a live line sequence.
    Streamed,
}

/// Live, ordered, line-oriented stdout of a streamed daemon.
///
/// Lazy and non-restartable: once a line has been read it is gone.
#[derive(Debug)]
pub struct ProcessOutput {
    lines: Lines<BufReader<ChildStdout>>,
}

impl ProcessOutput {
    /// Next stdout line, or `None` once the child closed its stdout.
    pub async fn next_line(&mut self) -> Result<Option<String>, ConductorError> {
        Ok(self.lines.next_line().await?)
    }
}

/// Supervises one long-running daemon process (node, indexer, relay).
///
/// The handle exclusively owns the underlying OS process; the `&mut self`
/// API makes concurrent `start` calls on one instance unrepresentable, so a
/// second starter deterministically receives
/// [ConductorError::ProcessAlreadyRunning].
#[derive(Debug)]
pub struct ProcessSupervisor {
    name: String,
    output_mode: OutputMode,
    state: ProcessState,
    child: Option<Child>,
    exit_status: Option<ExitStatus>,
}

impl ProcessSupervisor {
    pub fn new(name: &str, output_mode: OutputMode) -> Self {
        Self {
            name: name.to_string(),
            output_mode,
            state: ProcessState::NotStarted,
            child: None,
            exit_status: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Spawn the daemon and transition to `Running`.
    ///
    /// Returns once the spawn completed, not once the process exits; the
    /// caller gets the live output stream in [OutputMode::Streamed] mode.
    /// Only valid from `NotStarted`: a handle that is `Running` or already
    /// `Terminated` rejects the call without touching any running child. On
    /// a spawn failure the handle stays in `NotStarted`.
    pub async fn start(
        &mut self,
        invocation: &CommandInvocation,
    ) -> Result<Option<ProcessOutput>, ConductorError> {
        if self.state != ProcessState::NotStarted {
            return Err(ConductorError::ProcessAlreadyRunning {
                name: self.name.clone(),
                state: self.state,
            });
        }

        let (stdout, stderr) = match self.output_mode {
            OutputMode::Suppressed => (Stdio::null(), Stdio::null()),
            OutputMode::Streamed => (Stdio::piped(), Stdio::null()),
        };
        let mut child = spawn_child(invocation, stdout, stderr)?;

        let output = child.stdout.take().map(|stdout| ProcessOutput {
            lines: BufReader::new(stdout).lines(),
        });

        info!(
            "Started {}", &self.name;
            "pid" => child.id(), "argv" => #?invocation.argv()
        );

        self.child = Some(child);
        self.state = ProcessState::Running;

        Ok(output)
    }

    /// Current lifecycle state, reconciled with the OS.
    ///
    /// An exit that was not requested through [Self::stop] is detected here
    /// and flips the handle to `Terminated` before the state is reported.
    pub fn status(&mut self) -> ProcessState {
        if self.state == ProcessState::Running {
            if let Some(child) = self.child.as_mut() {
                match child.try_wait() {
                    Ok(Some(exit_status)) => {
                        warn!(
                            "{} exited unexpectedly", &self.name;
                            "exit_status" => exit_status.to_string()
                        );
                        self.exit_status = Some(exit_status);
                        self.state = ProcessState::Terminated;
                    }
                    Ok(None) => (),
                    Err(error) => {
                        warn!("Failed to probe {} liveness: {error}", &self.name);
                    }
                }
            }
        }

        self.state
    }

    pub fn is_running(&mut self) -> bool {
        self.status() == ProcessState::Running
    }

    /// Request termination of a `Running` daemon and wait for it to exit.
    ///
    /// A no-op on a handle that is not `Running`.
    pub async fn stop(&mut self) -> Result<(), ConductorError> {
        if self.status() != ProcessState::Running {
            return Ok(());
        }

        if let Some(child) = self.child.as_mut() {
            let name = self.name.clone();
            info!("Stopping {}", name);
            if let Err(error) = child.start_kill() {
                // the child may have exited in between
                if child.try_wait()?.is_none() {
                    return Err(error.into());
                }
            }
            let exit_status = child.wait().await?;
            self.exit_status = Some(exit_status);
        }
        self.state = ProcessState::Terminated;

        Ok(())
    }

    /// Wait for the process to exit on its own.
    ///
    /// Returns the exit status, the recorded one if the process already
    /// terminated, or `None` for a handle that was never started.
    pub async fn wait(&mut self) -> Result<Option<ExitStatus>, ConductorError> {
        match self.status() {
            ProcessState::NotStarted => Ok(None),
            ProcessState::Terminated => Ok(self.exit_status),
            ProcessState::Running => match self.child.as_mut() {
                Some(child) => {
                    let exit_status = child.wait().await?;
                    self.exit_status = Some(exit_status);
                    self.state = ProcessState::Terminated;
                    Ok(Some(exit_status))
                }
                None => Ok(None),
            },
        }
    }
}
