use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use slog_scope::debug;
use tokio::process::{Child, Command};

use crate::error::ConductorError;

/// One subprocess invocation: full argument vector, optional working
/// directory and an environment overlay merged over the inherited
/// environment.
///
/// `argv[0]` is always the resolved absolute binary path; the remaining
/// elements are passed through unmodified. Transient, built per call.
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    argv: Vec<String>,
    work_dir: Option<PathBuf>,
    env: HashMap<String, String>,
}

impl CommandInvocation {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            work_dir: None,
            env: HashMap::new(),
        }
    }

    pub fn with_work_dir(mut self, work_dir: &Path) -> Self {
        self.work_dir = Some(work_dir.to_path_buf());
        self
    }

    pub fn with_env_var(mut self, name: &str, value: &str) -> Self {
        self.env.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    pub fn work_dir(&self) -> Option<&Path> {
        self.work_dir.as_deref()
    }

    fn to_command(&self) -> Result<Command, ConductorError> {
        let program = self
            .argv
            .first()
            .ok_or(ConductorError::ConfigurationMissing {
                field: "argv[0] (resolved binary path)",
            })?;

        let mut command = Command::new(program);
        command.args(&self.argv[1..]).envs(&self.env).kill_on_drop(true);
        if let Some(work_dir) = &self.work_dir {
            command.current_dir(work_dir);
        }

        Ok(command)
    }
}

/// Runs one-shot commands to completion, capturing their output.
///
/// No retry happens at this layer; callers that need polling build it on
/// top (see [crate::device::DeviceHandshake]).
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor;

impl CommandExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Run the invocation to completion and return its captured stdout text.
    ///
    /// A non-zero exit yields [ConductorError::CommandFailed] carrying the
    /// captured stderr (or stdout when stderr is empty, as some binaries
    /// report diagnostics there). Trailing whitespace is left to the caller.
    pub async fn execute(
        &self,
        invocation: &CommandInvocation,
    ) -> Result<String, ConductorError> {
        let mut command = invocation.to_command()?;
        command.stdin(Stdio::null());

        debug!("Running one-shot command"; "argv" => #?invocation.argv());

        let output =
            command
                .output()
                .await
                .map_err(|error| ConductorError::CommandFailed {
                    argv: invocation.argv().to_vec(),
                    diagnostic: format!("failed to spawn: {error}"),
                })?;

        if output.status.success() {
            String::from_utf8(output.stdout).map_err(|_| ConductorError::InvalidOutput {
                context: "command stdout is not valid utf-8".to_string(),
                output: String::new(),
            })
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let diagnostic = if stderr.is_empty() {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            } else {
                stderr
            };

            Err(ConductorError::CommandFailed {
                argv: invocation.argv().to_vec(),
                diagnostic,
            })
        }
    }
}

/// Spawn the invocation without waiting for it, with the given stdio wiring.
///
/// Shared process-launching primitive of the executor and the supervisor. A
/// vanished binary maps to [ConductorError::BinaryNotFound], anything else
/// that prevents the spawn to [ConductorError::CommandFailed].
pub(crate) fn spawn_child(
    invocation: &CommandInvocation,
    stdout: Stdio,
    stderr: Stdio,
) -> Result<Child, ConductorError> {
    let mut command = invocation.to_command()?;
    command.stdin(Stdio::null()).stdout(stdout).stderr(stderr);

    command.spawn().map_err(|error| {
        if error.kind() == std::io::ErrorKind::NotFound {
            ConductorError::BinaryNotFound {
                name: invocation.argv()[0].clone(),
            }
        } else {
            ConductorError::CommandFailed {
                argv: invocation.argv().to_vec(),
                diagnostic: format!("failed to spawn: {error}"),
            }
        }
    })
}
