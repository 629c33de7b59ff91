use std::path::PathBuf;

use thiserror::Error;

use crate::device::DeviceVendor;
use crate::supervisor::ProcessState;

/// Errors raised by the orchestration layer.
///
/// Every failure mode is surfaced as a typed value so callers can match on
/// the kind instead of scraping messages. Construction of a façade is
/// all-or-nothing: any resolution or version-gate variant raised during
/// `ExternalBinary::connect` leaves the caller without a usable façade.
#[derive(Error, Debug)]
pub enum ConductorError {
    /// The configured or searched-for executable does not exist.
    #[error("binary `{name}` not found")]
    BinaryNotFound {
        /// Name of the binary that was looked up.
        name: String,
    },

    /// The path exists but is not a regular executable file.
    #[error("path {path:?} exists but is not an executable regular file")]
    NotExecutable {
        /// Offending path.
        path: PathBuf,
    },

    /// The binary self-reported a version below the façade's floor.
    #[error("unsupported version `{current}`, minimum supported version is `{minimum}`")]
    UnsupportedVersion {
        /// Version parsed from the binary output.
        current: semver::Version,
        /// Minimum version required by the façade.
        minimum: semver::Version,
    },

    /// Expected structured text could not be located in a command output.
    #[error("invalid output, {context}; output: `{output}`")]
    InvalidOutput {
        /// What was being looked for.
        context: String,
        /// The raw output that was inspected.
        output: String,
    },

    /// A one-shot command exited non-zero or could not be spawned at all.
    #[error("command {argv:?} failed: {diagnostic}")]
    CommandFailed {
        /// Full argument vector of the invocation, `argv[0]` included.
        argv: Vec<String>,
        /// Captured stderr, or the spawn error when no process ran.
        diagnostic: String,
    },

    /// A `start` request was issued against a handle that already left
    /// the `NotStarted` state.
    #[error("process `{name}` was already started (state: {state:?})")]
    ProcessAlreadyRunning {
        /// Name of the supervised process.
        name: String,
        /// Lifecycle state the handle was in when `start` was called.
        state: ProcessState,
    },

    /// The hardware-wallet handshake exhausted its retry budget.
    #[error("hardware wallet unreachable after {attempts} attempts")]
    DeviceUnreachable {
        /// Number of attempts consumed before giving up.
        attempts: u32,
    },

    /// The device answered but its status text matched no known vendor.
    #[error("could not classify hardware wallet vendor; status: `{status}`")]
    UnsupportedDeviceVendor {
        /// The status text that was inspected.
        status: String,
    },

    /// The detected vendor differs from the one the caller required.
    #[error("detected a {detected} device, but a {required} device is required")]
    DeviceVendorMismatch {
        /// Vendor classified from the device status.
        detected: DeviceVendor,
        /// Vendor the caller asked for.
        required: DeviceVendor,
    },

    /// A required configuration field is absent.
    #[error("missing required configuration: {field}")]
    ConfigurationMissing {
        /// Name of the missing field.
        field: &'static str,
    },

    /// The caller cancelled an in-flight handshake.
    #[error("hardware wallet handshake was cancelled")]
    HandshakeCancelled,

    /// Filesystem or process-control failure outside the taxonomy above.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
