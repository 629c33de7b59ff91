//! Process-orchestration and device-handshake layer shared by the typed
//! façades over the external Cardano ecosystem binaries (node, indexer,
//! signer, hardware-wallet bridge, light client, snapshot downloader).
//!
//! A façade resolves its executable, passes it through the version gate
//! once at construction, and thereafter runs one-shot commands through the
//! executor or supervises a long-running daemon. The hardware-wallet façade
//! additionally runs the bounded-retry device handshake before any signing
//! operation.

mod binary;
pub mod catalog;
mod command;
pub mod device;
mod error;
mod facade;
mod supervisor;
mod version;

pub use binary::{ensure_work_dir, resolve_binary, BinaryDescriptor};
pub use command::{CommandExecutor, CommandInvocation};
pub use error::ConductorError;
pub use facade::{
    BinaryConfig, ExternalBinary, Invokable, NodeSocketPath, Resolvable, Supervisable,
    CARDANO_NODE_SOCKET_PATH,
};
pub use supervisor::{OutputMode, ProcessOutput, ProcessState, ProcessSupervisor};
pub use version::{extract_version, VersionGate};

/// Generic result type used by the application layer.
pub type StdResult<T> = anyhow::Result<T>;
