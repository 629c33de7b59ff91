use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use semver::Version;
use slog_scope::info;

use crate::binary::{ensure_work_dir, resolve_binary, BinaryDescriptor};
use crate::command::{CommandExecutor, CommandInvocation};
use crate::error::ConductorError;
use crate::supervisor::{OutputMode, ProcessSupervisor};
use crate::version::VersionGate;

/// Environment variable through which the external binaries locate the node
/// socket. The name is fixed by `cardano-node` itself.
pub const CARDANO_NODE_SOCKET_PATH: &str = "CARDANO_NODE_SOCKET_PATH";

/// Node socket location shared between the node façade and its dependents
/// (indexer, light client).
///
/// The value is passed explicitly at construction time; writing it into a
/// child's environment is a compatibility shim for the external binaries,
/// which genuinely read `CARDANO_NODE_SOCKET_PATH`. One façade is the writer
/// within a process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSocketPath {
    path: PathBuf,
}

impl NodeSocketPath {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn export_into(&self, env: &mut HashMap<String, String>) {
        env.insert(
            CARDANO_NODE_SOCKET_PATH.to_string(),
            self.path.display().to_string(),
        );
    }
}

/// Everything needed to construct a façade over one external binary.
#[derive(Debug, Clone)]
pub struct BinaryConfig {
    pub name: String,
    /// When unset the binary is searched in the `PATH` directories.
    pub explicit_path: Option<PathBuf>,
    pub minimum_version: Version,
    /// Arguments of the version-reporting subcommand; there is no universal
    /// flag across the fronted binaries (`--version`, `version`, `help`).
    pub version_args: Vec<String>,
    pub work_dir: Option<PathBuf>,
    pub env: HashMap<String, String>,
}

impl BinaryConfig {
    pub fn new(name: &str, minimum_version: Version) -> Self {
        Self {
            name: name.to_string(),
            explicit_path: None,
            minimum_version,
            version_args: vec!["--version".to_string()],
            work_dir: None,
            env: HashMap::new(),
        }
    }

    pub fn with_explicit_path(mut self, path: &Path) -> Self {
        self.explicit_path = Some(path.to_path_buf());
        self
    }

    pub fn with_version_args(mut self, args: &[&str]) -> Self {
        self.version_args = args.iter().map(|arg| arg.to_string()).collect();
        self
    }

    pub fn with_work_dir(mut self, work_dir: &Path) -> Self {
        self.work_dir = Some(work_dir.to_path_buf());
        self
    }

    pub fn with_env_var(mut self, name: &str, value: &str) -> Self {
        self.env.insert(name.to_string(), value.to_string());
        self
    }

    /// Point the façade's child processes at the node socket.
    pub fn with_node_socket(mut self, socket: &NodeSocketPath) -> Self {
        socket.export_into(&mut self.env);
        self
    }
}

/// A façade holds a resolved, validated binary.
pub trait Resolvable {
    fn descriptor(&self) -> &BinaryDescriptor;
}

/// Request/response operations against the binary.
#[async_trait]
pub trait Invokable: Resolvable {
    fn invocation(&self, args: &[String]) -> CommandInvocation;

    async fn invoke(&self, args: &[String]) -> Result<String, ConductorError>;
}

/// "Run forever" lifecycle for the daemon binaries.
pub trait Supervisable: Resolvable {
    fn supervisor(&self, output_mode: OutputMode) -> ProcessSupervisor;
}

/// Shared construction flow and delegation target of every per-binary façade.
///
/// `connect` is all-or-nothing: resolution, working-directory creation and
/// the version gate all succeed or the caller gets no value, and the gate
/// runs exactly once here.
#[derive(Debug)]
pub struct ExternalBinary {
    descriptor: BinaryDescriptor,
    version: Version,
    work_dir: Option<PathBuf>,
    env: HashMap<String, String>,
    executor: CommandExecutor,
}

impl ExternalBinary {
    pub async fn connect(config: BinaryConfig) -> Result<Self, ConductorError> {
        let path = resolve_binary(&config.name, config.explicit_path.as_deref())?;
        if let Some(work_dir) = &config.work_dir {
            ensure_work_dir(work_dir)?;
        }
        let descriptor =
            BinaryDescriptor::new(&config.name, config.minimum_version.clone(), path);

        let executor = CommandExecutor::new();
        let mut version_argv = vec![descriptor.path().display().to_string()];
        version_argv.extend(config.version_args.iter().cloned());
        let raw_version_output = executor
            .execute(&CommandInvocation::new(version_argv))
            .await?;

        let gate = VersionGate::new(&config.name, config.minimum_version.clone());
        let version = gate.check(&raw_version_output)?;

        info!(
            "Connected to {}", &config.name;
            "path" => descriptor.path().display().to_string(),
            "version" => version.to_string()
        );

        Ok(Self {
            descriptor,
            version,
            work_dir: config.work_dir,
            env: config.env,
            executor,
        })
    }

    /// Version parsed from the binary's own output during construction.
    pub fn version(&self) -> &Version {
        &self.version
    }
}

impl Resolvable for ExternalBinary {
    fn descriptor(&self) -> &BinaryDescriptor {
        &self.descriptor
    }
}

#[async_trait]
impl Invokable for ExternalBinary {
    fn invocation(&self, args: &[String]) -> CommandInvocation {
        let mut argv = vec![self.descriptor.path().display().to_string()];
        argv.extend(args.iter().cloned());

        let mut invocation = CommandInvocation::new(argv).with_env(self.env.clone());
        if let Some(work_dir) = &self.work_dir {
            invocation = invocation.with_work_dir(work_dir);
        }

        invocation
    }

    async fn invoke(&self, args: &[String]) -> Result<String, ConductorError> {
        self.executor.execute(&self.invocation(args)).await
    }
}

impl Supervisable for ExternalBinary {
    fn supervisor(&self, output_mode: OutputMode) -> ProcessSupervisor {
        ProcessSupervisor::new(self.descriptor.name(), output_mode)
    }
}
