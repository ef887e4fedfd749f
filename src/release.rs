//! Release descriptors and download URL construction.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::platform::PlatformId;

pub const DEFAULT_HOST: &str = "https://github.com";

/// Compression format of published release archives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArchiveFormat {
    #[default]
    #[serde(rename = "tar.gz")]
    TarGz,
    #[serde(rename = "zip")]
    Zip,
}

impl ArchiveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::Zip => "zip",
        }
    }
}

impl FromStr for ArchiveFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tar.gz" | "tgz" => Ok(ArchiveFormat::TarGz),
            "zip" => Ok(ArchiveFormat::Zip),
            other => Err(anyhow!(
                "Unsupported archive format '{}'. Expected 'tar.gz' or 'zip'.",
                other
            )),
        }
    }
}

/// Where releases of a package are published
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseSource {
    pub host: String,
    pub owner: String,
    pub repo: String,
    pub archive_format: ArchiveFormat,
}

impl ReleaseSource {
    /// Parse an `owner/repo` repository on the given host.
    pub fn new(host: &str, repository: &str, archive_format: ArchiveFormat) -> Result<Self> {
        let parts: Vec<&str> = repository.split('/').collect();
        if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
            return Err(anyhow!(
                "Invalid repository '{}'. Expected 'owner/repo'.",
                repository
            ));
        }
        Ok(Self {
            host: host.trim_end_matches('/').to_string(),
            owner: parts[0].to_string(),
            repo: parts[1].to_string(),
            archive_format,
        })
    }

    /// True when the releases are hosted on github.com itself.
    pub fn is_github(&self) -> bool {
        self.host == DEFAULT_HOST || self.host == "https://www.github.com"
    }
}

/// The inputs that identify one downloadable artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseDescriptor {
    pub package_name: String,
    pub version: String,
    pub platform: PlatformId,
}

impl ReleaseDescriptor {
    pub fn new(package_name: &str, version: &str, platform: PlatformId) -> Self {
        Self {
            package_name: package_name.to_string(),
            version: normalize_version(version),
            platform,
        }
    }

    /// Release asset file name, e.g. `tool-linux.tar.gz`.
    pub fn asset_name(&self, format: ArchiveFormat) -> String {
        format!(
            "{}-{}.{}",
            self.package_name,
            self.platform,
            format.extension()
        )
    }

    /// File name of the executable inside the archive.
    pub fn executable_name(&self) -> String {
        self.platform.executable_name(&self.package_name)
    }
}

impl fmt::Display for ReleaseDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.package_name, self.version, self.platform)
    }
}

/// Versions are tagged `v<version>`; a `v` already present is not doubled.
fn normalize_version(version: &str) -> String {
    let version = version.trim();
    version.strip_prefix('v').unwrap_or(version).to_string()
}

/// Build the download URL for a release artifact.
///
/// `<host>/<owner>/<repo>/releases/download/v<version>/<package>-<platform>.<ext>`
pub fn compute_url(source: &ReleaseSource, descriptor: &ReleaseDescriptor) -> String {
    format!(
        "{}/{}/{}/releases/download/v{}/{}",
        source.host,
        source.owner,
        source.repo,
        descriptor.version,
        descriptor.asset_name(source.archive_format)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> ReleaseSource {
        ReleaseSource::new(DEFAULT_HOST, "owner/my-program", ArchiveFormat::TarGz).unwrap()
    }

    #[test]
    fn test_compute_url_shape() {
        let descriptor = ReleaseDescriptor::new("my-program", "1.2.3", PlatformId::Win64);
        assert_eq!(
            compute_url(&source(), &descriptor),
            "https://github.com/owner/my-program/releases/download/v1.2.3/my-program-win64.tar.gz"
        );
    }

    #[test]
    fn test_compute_url_is_deterministic() {
        let a = ReleaseDescriptor::new("tool", "2.0.0", PlatformId::MacosAarch64);
        let b = ReleaseDescriptor::new("tool", "2.0.0", PlatformId::MacosAarch64);
        assert_eq!(compute_url(&source(), &a), compute_url(&source(), &b));
    }

    #[test]
    fn test_compute_url_changes_with_each_input() {
        let base = ReleaseDescriptor::new("tool", "1.0.0", PlatformId::Linux);
        let url = compute_url(&source(), &base);

        let variants = [
            ReleaseDescriptor::new("other", "1.0.0", PlatformId::Linux),
            ReleaseDescriptor::new("tool", "1.0.1", PlatformId::Linux),
            ReleaseDescriptor::new("tool", "1.0.0", PlatformId::MacosX86_64),
        ];
        for variant in variants {
            assert_ne!(compute_url(&source(), &variant), url, "{}", variant);
        }
    }

    #[test]
    fn test_version_prefix_and_host_slash_not_doubled() {
        let source =
            ReleaseSource::new("https://mirror.example.com/", "o/r", ArchiveFormat::Zip).unwrap();
        let descriptor = ReleaseDescriptor::new("tool", "v0.3.0", PlatformId::Win32);
        assert_eq!(
            compute_url(&source, &descriptor),
            "https://mirror.example.com/o/r/releases/download/v0.3.0/tool-win32.zip"
        );
    }

    #[test]
    fn test_release_source_rejects_bad_repository() {
        for bad in ["owner", "owner/", "/repo", "a/b/c", ""] {
            assert!(
                ReleaseSource::new(DEFAULT_HOST, bad, ArchiveFormat::TarGz).is_err(),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn test_archive_format_parsing() {
        assert_eq!("tar.gz".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::TarGz);
        assert_eq!("TGZ".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::TarGz);
        assert_eq!("zip".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::Zip);
        assert!("rar".parse::<ArchiveFormat>().is_err());
    }

    #[test]
    fn test_is_github() {
        assert!(source().is_github());
        let mirror =
            ReleaseSource::new("http://127.0.0.1:1234", "o/r", ArchiveFormat::TarGz).unwrap();
        assert!(!mirror.is_github());
    }
}
