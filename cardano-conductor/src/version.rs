use std::sync::OnceLock;

use regex::Regex;
use semver::Version;

use crate::error::ConductorError;

fn semver_triple_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(\d+)\.(\d+)\.(\d+)").unwrap())
}

/// Extract the first `major.minor.patch` triple found anywhere in the given text.
///
/// The binaries fronted by this crate embed their version inside longer
/// banners (`cardano-node 8.1.2 - linux-x86_64 - ghc-9.2`,
/// `v6.13.0 (4e93e254)`), so the whole text is scanned and any pre-release
/// or build suffix following the triple is discarded.
pub fn extract_version(text: &str) -> Option<Version> {
    let captures = semver_triple_regex().captures(text)?;
    let major = captures.get(1)?.as_str().parse().ok()?;
    let minor = captures.get(2)?.as_str().parse().ok()?;
    let patch = captures.get(3)?.as_str().parse().ok()?;

    Some(Version::new(major, minor, patch))
}

/// Enforces that a binary's self-reported version is at least a configured minimum.
///
/// The check runs exactly once per façade, at construction time, against the
/// raw text of the binary's version-reporting subcommand.
#[derive(Debug, Clone)]
pub struct VersionGate {
    binary_name: String,
    minimum: Version,
}

impl VersionGate {
    pub fn new(binary_name: &str, minimum: Version) -> Self {
        Self {
            binary_name: binary_name.to_string(),
            minimum,
        }
    }

    /// Parse the version embedded in `raw_output` and compare it against the minimum.
    ///
    /// Comparison is on the numeric triple only, never string lexicographic,
    /// so `10.0.0` is above `9.0.0`.
    pub fn check(&self, raw_output: &str) -> Result<Version, ConductorError> {
        let current =
            extract_version(raw_output).ok_or_else(|| ConductorError::InvalidOutput {
                context: format!(
                    "no semver triple in `{}` version output",
                    self.binary_name
                ),
                output: raw_output.trim().to_string(),
            })?;

        if current >= self.minimum {
            Ok(current)
        } else {
            Err(ConductorError::UnsupportedVersion {
                current,
                minimum: self.minimum.clone(),
            })
        }
    }
}
