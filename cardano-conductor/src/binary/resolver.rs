use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use slog_scope::debug;

use crate::error::ConductorError;

/// Locate and validate the executable for `name`.
///
/// With an explicit path the path itself is validated; without one, each
/// directory of the `PATH` environment variable is searched in order and the
/// first executable entry named `name` wins. The returned path is absolute.
pub fn resolve_binary(
    name: &str,
    explicit_path: Option<&Path>,
) -> Result<PathBuf, ConductorError> {
    if name.is_empty() {
        return Err(ConductorError::BinaryNotFound {
            name: name.to_string(),
        });
    }

    let resolved = match explicit_path {
        Some(path) => validate_explicit(name, path)?,
        None => search_dirs(name, std::env::split_paths(&path_env()))?,
    };

    debug!("Resolved binary"; "name" => name, "path" => resolved.display().to_string());

    Ok(resolved)
}

/// Create the configured working directory, parents included, if it does not exist.
pub fn ensure_work_dir(work_dir: &Path) -> Result<(), ConductorError> {
    std::fs::create_dir_all(work_dir)?;

    Ok(())
}

fn path_env() -> std::ffi::OsString {
    std::env::var_os("PATH").unwrap_or_default()
}

fn validate_explicit(name: &str, path: &Path) -> Result<PathBuf, ConductorError> {
    let metadata = match path.metadata() {
        Ok(metadata) => metadata,
        Err(error) if error.kind() == ErrorKind::NotFound => {
            return Err(ConductorError::BinaryNotFound {
                name: name.to_string(),
            });
        }
        Err(error) => return Err(error.into()),
    };

    if !metadata.is_file() || !is_executable(&metadata) {
        return Err(ConductorError::NotExecutable {
            path: path.to_path_buf(),
        });
    }

    Ok(path.canonicalize()?)
}

fn search_dirs(
    name: &str,
    dirs: impl Iterator<Item = PathBuf>,
) -> Result<PathBuf, ConductorError> {
    for dir in dirs {
        let candidate = dir.join(name);
        if let Ok(metadata) = candidate.metadata() {
            if metadata.is_file() && is_executable(&metadata) {
                return Ok(candidate.canonicalize()?);
            }
        }
    }

    Err(ConductorError::BinaryNotFound {
        name: name.to_string(),
    })
}

#[cfg(unix)]
fn is_executable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;

    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(metadata: &std::fs::Metadata) -> bool {
    metadata.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_is_not_found() {
        match resolve_binary("", None) {
            Err(ConductorError::BinaryNotFound { name }) => assert_eq!("", name),
            other => panic!("expected BinaryNotFound, got {other:?}"),
        }
    }

    #[test]
    fn missing_explicit_path_is_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();

        match resolve_binary("ghost-node", Some(&temp_dir.path().join("ghost-node"))) {
            Err(ConductorError::BinaryNotFound { name }) => assert_eq!("ghost-node", name),
            other => panic!("expected BinaryNotFound, got {other:?}"),
        }
    }

    #[test]
    fn explicit_path_to_a_directory_is_not_executable() {
        let temp_dir = tempfile::tempdir().unwrap();

        match resolve_binary("cardano-node", Some(temp_dir.path())) {
            Err(ConductorError::NotExecutable { path }) => {
                assert_eq!(temp_dir.path(), path)
            }
            other => panic!("expected NotExecutable, got {other:?}"),
        }
    }

    #[test]
    fn ensure_work_dir_creates_nested_directories() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested = temp_dir.path().join("facade").join("node").join("work");

        ensure_work_dir(&nested).unwrap();

        assert!(nested.is_dir());
        // still writable afterwards
        std::fs::write(nested.join("probe.txt"), "ok").unwrap();
    }

    // Unix only as those tests leverage shell scripts and unix permissions
    #[cfg(unix)]
    mod unix_only {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;

        use super::*;

        fn write_script(dir: &Path, file_name: &str, mode: u32, content: &str) -> PathBuf {
            let script_path = dir.join(file_name);
            let mut file = std::fs::OpenOptions::new()
                .create_new(true)
                .write(true)
                .mode(mode)
                .open(&script_path)
                .unwrap();
            file.write_all(format!("#!/bin/bash\n\n{content}\n").as_ref())
                .unwrap();

            script_path
        }

        #[test]
        fn explicit_executable_path_resolves() {
            let temp_dir = tempfile::tempdir().unwrap();
            let script = write_script(temp_dir.path(), "cardano-signer", 0o755, "exit 0");

            let resolved = resolve_binary("cardano-signer", Some(&script)).unwrap();

            assert!(resolved.is_absolute());
            assert_eq!(script.canonicalize().unwrap(), resolved);
        }

        #[test]
        fn explicit_path_without_execute_bit_is_not_executable() {
            let temp_dir = tempfile::tempdir().unwrap();
            let script = write_script(temp_dir.path(), "cardano-signer", 0o644, "exit 0");

            match resolve_binary("cardano-signer", Some(&script)) {
                Err(ConductorError::NotExecutable { path }) => assert_eq!(script, path),
                other => panic!("expected NotExecutable, got {other:?}"),
            }
        }

        #[test]
        fn search_returns_first_executable_match() {
            let first_dir = tempfile::tempdir().unwrap();
            let second_dir = tempfile::tempdir().unwrap();
            // not executable in the first dir, executable in the second
            write_script(first_dir.path(), "cardano-node", 0o644, "exit 0");
            let expected = write_script(second_dir.path(), "cardano-node", 0o755, "exit 0");

            let resolved = search_dirs(
                "cardano-node",
                [
                    first_dir.path().to_path_buf(),
                    second_dir.path().to_path_buf(),
                ]
                .into_iter(),
            )
            .unwrap();

            assert_eq!(expected.canonicalize().unwrap(), resolved);
        }

        #[test]
        fn search_without_match_is_not_found() {
            let temp_dir = tempfile::tempdir().unwrap();

            match search_dirs("cardano-node", [temp_dir.path().to_path_buf()].into_iter()) {
                Err(ConductorError::BinaryNotFound { name }) => {
                    assert_eq!("cardano-node", name)
                }
                other => panic!("expected BinaryNotFound, got {other:?}"),
            }
        }
    }
}
