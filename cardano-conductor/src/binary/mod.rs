//! Executable resolution and validation for the external Cardano binaries.

mod resolver;

pub use resolver::{ensure_work_dir, resolve_binary};

use std::path::{Path, PathBuf};

use semver::Version;

/// A resolved external binary, immutable once constructed.
///
/// The path is only ever set after it has been confirmed to point at an
/// existing executable regular file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryDescriptor {
    name: String,
    minimum_version: Version,
    path: PathBuf,
}

impl BinaryDescriptor {
    pub(crate) fn new(name: &str, minimum_version: Version, path: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            minimum_version,
            path,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn minimum_version(&self) -> &Version {
        &self.minimum_version
    }

    /// Absolute path of the verified executable.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
