use super::{PlatformId, resolve};
use crate::error::BootstrapError;

/// Host OS and architecture in the names the platform table expects.
#[derive(Debug, Clone, PartialEq)]
pub struct HostPlatform {
    pub os: String,
    pub arch: String,
}

impl HostPlatform {
    /// Detect the host from compile-time target information
    pub fn detect() -> Self {
        Self::from_target(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Translate Rust target names (`macos`, `x86_64`, ...) into table names.
    /// Unknown names pass through unchanged so errors report them verbatim.
    pub fn from_target(os: &str, arch: &str) -> Self {
        let os = match os {
            "windows" => "Windows",
            "linux" => "Linux",
            "macos" => "macOS",
            other => other,
        };
        let arch = match arch {
            "x86_64" => "x64",
            "aarch64" => "arm64",
            "x86" => "ia32",
            other => other,
        };
        Self {
            os: os.to_string(),
            arch: arch.to_string(),
        }
    }

    pub fn resolve(&self) -> Result<PlatformId, BootstrapError> {
        resolve(&self.os, &self.arch)
    }
}

/// Trait for platform detection (useful for testing)
pub trait PlatformDetector: Send + Sync {
    fn detect(&self) -> HostPlatform;
}

/// Detector backed by the target the binary was compiled for
pub struct DefaultPlatformDetector;

impl PlatformDetector for DefaultPlatformDetector {
    fn detect(&self) -> HostPlatform {
        HostPlatform::detect()
    }
}
