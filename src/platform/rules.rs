use log::debug;

use super::PlatformId;
use crate::error::BootstrapError;

const WINDOWS: &[&str] = &["windows", "windows_nt", "win32"];
const LINUX: &[&str] = &["linux"];
const MACOS: &[&str] = &["macos", "darwin", "osx"];

const X64: &[&str] = &["x64", "x86_64", "amd64"];
const ARM64: &[&str] = &["arm64", "aarch64"];

/// One row of the platform table. `arch: None` matches any architecture.
#[derive(Debug, Clone, Copy)]
pub struct PlatformRule {
    pub os: &'static [&'static str],
    pub arch: Option<&'static [&'static str]>,
    pub platform: PlatformId,
}

impl PlatformRule {
    pub fn matches(&self, os_name: &str, arch_name: &str) -> bool {
        names_match(self.os, os_name) && self.arch.is_none_or(|arch| names_match(arch, arch_name))
    }
}

fn names_match(aliases: &[&str], name: &str) -> bool {
    aliases.iter().any(|alias| alias.eq_ignore_ascii_case(name.trim()))
}

/// Platform table, checked top to bottom. Specific rows precede catch-alls.
pub const PLATFORM_RULES: &[PlatformRule] = &[
    PlatformRule {
        os: WINDOWS,
        arch: Some(X64),
        platform: PlatformId::Win64,
    },
    PlatformRule {
        os: WINDOWS,
        arch: None,
        platform: PlatformId::Win32,
    },
    PlatformRule {
        os: LINUX,
        arch: Some(X64),
        platform: PlatformId::Linux,
    },
    PlatformRule {
        os: MACOS,
        arch: Some(X64),
        platform: PlatformId::MacosX86_64,
    },
    PlatformRule {
        os: MACOS,
        arch: Some(ARM64),
        platform: PlatformId::MacosAarch64,
    },
];

/// Map an (OS, architecture) pair to its platform; the first matching rule wins.
pub fn resolve(os_name: &str, arch_name: &str) -> Result<PlatformId, BootstrapError> {
    let platform = PLATFORM_RULES
        .iter()
        .find(|rule| rule.matches(os_name, arch_name))
        .map(|rule| rule.platform)
        .ok_or_else(|| BootstrapError::UnsupportedPlatform {
            os: os_name.to_string(),
            arch: arch_name.to_string(),
        })?;

    debug!("Resolved {}/{} to {}", os_name, arch_name, platform);
    Ok(platform)
}
