//! Platform resolution
//!
//! Maps a host's (OS, architecture) pair onto the closed set of platforms
//! that release artifacts are published for. Unknown pairs are rejected.

mod detection;
mod rules;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use detection::{DefaultPlatformDetector, HostPlatform, PlatformDetector};
pub use rules::{PLATFORM_RULES, PlatformRule, resolve};

/// Canonical identifier of a supported platform, as used in asset names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatformId {
    #[serde(rename = "win64")]
    Win64,
    #[serde(rename = "win32")]
    Win32,
    #[serde(rename = "linux")]
    Linux,
    #[serde(rename = "macos-x86_64")]
    MacosX86_64,
    #[serde(rename = "macos-aarch64")]
    MacosAarch64,
}

impl PlatformId {
    pub const ALL: [PlatformId; 5] = [
        PlatformId::Win64,
        PlatformId::Win32,
        PlatformId::Linux,
        PlatformId::MacosX86_64,
        PlatformId::MacosAarch64,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformId::Win64 => "win64",
            PlatformId::Win32 => "win32",
            PlatformId::Linux => "linux",
            PlatformId::MacosX86_64 => "macos-x86_64",
            PlatformId::MacosAarch64 => "macos-aarch64",
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, PlatformId::Win64 | PlatformId::Win32)
    }

    /// File name of the executable `base` as shipped for this platform.
    pub fn executable_name(&self, base: &str) -> String {
        if self.is_windows() {
            format!("{}.exe", base)
        } else {
            base.to_string()
        }
    }

    /// Resolve the platform this process is running on.
    pub fn current() -> Result<Self> {
        Ok(DefaultPlatformDetector.detect().resolve()?)
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlatformId::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| anyhow!("Unknown platform '{}'", s))
    }
}
