use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::platform::PlatformId;
use crate::release::ReleaseDescriptor;
use crate::runtime::Runtime;

/// Written last into a staged install; marks the directory as complete.
pub const RECEIPT_FILE_NAME: &str = ".binboot-receipt.json";

/// Record of a completed install
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Receipt {
    pub package: String,
    pub version: String,
    pub platform: PlatformId,
    pub url: String,
    /// Executable file name, relative to the install directory
    pub executable: String,
}

impl Receipt {
    pub fn for_release(descriptor: &ReleaseDescriptor, url: &str) -> Self {
        Self {
            package: descriptor.package_name.clone(),
            version: descriptor.version.clone(),
            platform: descriptor.platform,
            url: url.to_string(),
            executable: descriptor.executable_name(),
        }
    }

    /// True if this receipt describes `descriptor`.
    /// The URL is not compared so a mirror change keeps the cache valid.
    pub fn matches(&self, descriptor: &ReleaseDescriptor) -> bool {
        self.package == descriptor.package_name
            && self.version == descriptor.version
            && self.platform == descriptor.platform
            && self.executable == descriptor.executable_name()
    }

    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, dir: &Path) -> Result<Self> {
        let path = dir.join(RECEIPT_FILE_NAME);
        let content = runtime.read_to_string(&path)?;
        serde_json::from_str(&content).with_context(|| format!("Invalid receipt {:?}", path))
    }

    #[tracing::instrument(skip(self, runtime))]
    pub fn save<R: Runtime>(&self, runtime: &R, dir: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        runtime.write(&dir.join(RECEIPT_FILE_NAME), json.as_bytes())
    }
}
