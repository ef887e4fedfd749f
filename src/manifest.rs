//! Package manifest: where the package name, version and release location come from.
//!
//! The manifest is a `package.json`-shaped document with a `binary` section:
//!
//! ```json
//! {
//!   "name": "my-program",
//!   "version": "1.2.3",
//!   "binary": { "repository": "owner/my-program" }
//! }
//! ```

use anyhow::Result;
use log::debug;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::BootstrapError;
use crate::release::{ArchiveFormat, DEFAULT_HOST, ReleaseSource};
use crate::runtime::Runtime;

pub const MANIFEST_FILE_NAME: &str = "package.json";

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Manifest {
    pub name: String,
    pub version: String,
    pub binary: Option<BinarySection>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct BinarySection {
    /// Executable name; defaults to the package name
    pub name: Option<String>,
    /// `owner/repo`
    pub repository: String,
    pub host: Option<String>,
    #[serde(default)]
    pub archive: ArchiveFormat,
}

impl Manifest {
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        let invalid = |reason: String| BootstrapError::Manifest {
            path: path.to_path_buf(),
            reason,
        };

        let content = runtime
            .read_to_string(path)
            .map_err(|e| invalid(format!("cannot read file: {:#}", e)))?;
        let manifest: Manifest =
            serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?;
        manifest.validate().map_err(invalid)?;

        debug!(
            "Loaded manifest {:?}: {} {}",
            path, manifest.name, manifest.version
        );
        Ok(manifest)
    }

    fn validate(&self) -> Result<(), String> {
        let binary = self
            .binary
            .as_ref()
            .ok_or_else(|| "missing 'binary' section".to_string())?;
        // Only the name that ends up in paths and URLs has to be a plain segment
        match &binary.name {
            Some(name) => check_segment("binary.name", name)?,
            None => check_segment("name", &self.name)?,
        }
        check_version("version", &self.version)
    }

    /// Name of the executable and prefix of the release asset.
    pub fn package_name(&self) -> &str {
        self.binary
            .as_ref()
            .and_then(|b| b.name.as_deref())
            .unwrap_or(&self.name)
    }

    /// Release location, with `host_override` taking precedence over the manifest.
    pub fn release_source(&self, host_override: Option<&str>) -> Result<ReleaseSource> {
        let binary = self
            .binary
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Manifest has no 'binary' section"))?;
        let host = host_override
            .or(binary.host.as_deref())
            .unwrap_or(DEFAULT_HOST);
        ReleaseSource::new(host, &binary.repository, binary.archive)
    }
}

/// Values end up as URL path segments and directory names.
pub(crate) fn check_segment(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("'{}' must not be empty", field));
    }
    if value == "." || value == ".." {
        return Err(format!("'{}' must not be '{}'", field, value));
    }
    if value
        .chars()
        .any(|c| c == '/' || c == '\\' || c.is_whitespace() || c.is_control())
    {
        return Err(format!(
            "'{}' contains characters not allowed in a path segment: {:?}",
            field, value
        ));
    }
    Ok(())
}

/// A version is a path segment with something left after the `v` prefix.
pub(crate) fn check_version(field: &str, value: &str) -> Result<(), String> {
    check_segment(field, value)?;
    if value.strip_prefix('v').is_some_and(str::is_empty) {
        return Err(format!("'{}' has no version number after 'v'", field));
    }
    Ok(())
}

/// Find the manifest: an explicit path wins, otherwise `package.json` next to
/// the running executable or one directory above it.
#[tracing::instrument(skip(runtime))]
pub fn locate_manifest<R: Runtime>(runtime: &R, explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }

    let exe = runtime.current_exe()?;
    let exe_dir = exe.parent().unwrap_or_else(|| Path::new("."));
    let candidates: Vec<PathBuf> = std::iter::once(exe_dir)
        .chain(exe_dir.parent())
        .map(|dir| dir.join(MANIFEST_FILE_NAME))
        .collect();

    for candidate in &candidates {
        if runtime.exists(candidate) {
            debug!("Using manifest {:?}", candidate);
            return Ok(candidate.clone());
        }
    }

    Err(BootstrapError::Manifest {
        path: candidates[0].clone(),
        reason: "not found next to the executable; pass --manifest or set BINBOOT_MANIFEST"
            .to_string(),
    }
    .into())
}
