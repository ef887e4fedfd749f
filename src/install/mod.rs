//! Fetching, unpacking and caching of release artifacts.
//!
//! Installs live at `<root>/<package>/<version>/<platform>/`. Work happens in
//! a per-process staging directory under `<root>/.staging/` and the finished
//! payload is renamed into place, so a reader either sees a complete install
//! or nothing.

mod receipt;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::archive::ArchiveExtractor;
use crate::cleanup::{self, CleanupGuard, SharedCleanupContext};
use crate::download::Downloader;
use crate::error::{BootstrapError, ExtractionFailure};
use crate::release::{ReleaseDescriptor, ReleaseSource, compute_url};
use crate::runtime::Runtime;

pub use receipt::{RECEIPT_FILE_NAME, Receipt};

/// Name of the directory holding in-progress installs.
pub const STAGING_DIR_NAME: &str = ".staging";

pub struct Installer<R: Runtime, D: Downloader, E: ArchiveExtractor> {
    runtime: R,
    downloader: D,
    extractor: E,
    source: ReleaseSource,
    install_root: PathBuf,
    cleanup_ctx: SharedCleanupContext,
}

impl<R: Runtime, D: Downloader, E: ArchiveExtractor> Installer<R, D, E> {
    pub fn new(
        runtime: R,
        downloader: D,
        extractor: E,
        source: ReleaseSource,
        install_root: PathBuf,
    ) -> Self {
        Self {
            runtime,
            downloader,
            extractor,
            source,
            install_root,
            cleanup_ctx: cleanup::new_shared(),
        }
    }

    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    /// Staging paths of the install in progress, for interrupt handling.
    pub fn cleanup_context(&self) -> SharedCleanupContext {
        self.cleanup_ctx.clone()
    }

    pub fn download_url(&self, descriptor: &ReleaseDescriptor) -> String {
        compute_url(&self.source, descriptor)
    }

    /// Directory holding every installed version of a package
    pub fn package_dir(&self, package_name: &str) -> PathBuf {
        self.install_root.join(package_name)
    }

    /// Version-qualified install directory for one release
    pub fn install_dir(&self, descriptor: &ReleaseDescriptor) -> PathBuf {
        self.package_dir(&descriptor.package_name)
            .join(&descriptor.version)
            .join(descriptor.platform.as_str())
    }

    /// Path of the executable if `descriptor` is completely installed.
    /// Never touches the network.
    pub fn installed_executable(&self, descriptor: &ReleaseDescriptor) -> Option<PathBuf> {
        let dir = self.install_dir(descriptor);
        let receipt = match Receipt::load(&self.runtime, &dir) {
            Ok(receipt) => receipt,
            Err(e) => {
                debug!("No usable receipt in {:?}: {:#}", dir, e);
                return None;
            }
        };
        if !receipt.matches(descriptor) {
            debug!("Receipt in {:?} is for a different release", dir);
            return None;
        }

        let executable = dir.join(&receipt.executable);
        if self.runtime.is_executable(&executable) {
            Some(executable)
        } else {
            debug!("{:?} is missing or not executable", executable);
            None
        }
    }

    /// Make sure `descriptor` is installed and return the executable path.
    ///
    /// A complete install is returned as is; otherwise the archive is
    /// downloaded once, unpacked in staging and moved into place.
    #[tracing::instrument(skip(self))]
    pub async fn ensure_installed(&self, descriptor: &ReleaseDescriptor) -> Result<PathBuf> {
        if let Some(executable) = self.installed_executable(descriptor) {
            debug!("{} already installed at {:?}", descriptor, executable);
            return Ok(executable);
        }

        let install_dir = self.install_dir(descriptor);
        self.install(descriptor, &install_dir).await
    }

    async fn install(&self, descriptor: &ReleaseDescriptor, install_dir: &Path) -> Result<PathBuf> {
        let url = self.download_url(descriptor);
        let executable_name = descriptor.executable_name();
        info!("Installing {} from {}", descriptor, url);

        let staging = self.staging_dir(descriptor);
        if self.runtime.exists(&staging) {
            self.runtime.remove_dir_all(&staging)?;
        }
        self.runtime
            .create_dir_all(&staging)
            .with_context(|| format!("Failed to create staging directory {:?}", staging))?;
        let guard = CleanupGuard::new(self.cleanup_ctx.clone(), staging);

        let archive_path = guard
            .path()
            .join(descriptor.asset_name(self.source.archive_format));
        self.downloader
            .download(&self.runtime, &url, &archive_path)
            .await?;

        let unpacked = guard.path().join("unpacked");
        self.runtime.create_dir_all(&unpacked)?;
        self.extractor
            .extract(&self.runtime, &archive_path, &unpacked)?;

        let payload = self.locate_payload(&unpacked, &executable_name, &archive_path)?;
        self.runtime
            .set_permissions(&payload.join(&executable_name), 0o755)
            .with_context(|| format!("Failed to make {} executable", executable_name))?;
        Receipt::for_release(descriptor, &url).save(&self.runtime, &payload)?;

        if let Some(executable) = self.commit(descriptor, &payload, install_dir, guard.path())? {
            return Ok(executable);
        }
        drop(guard);

        info!("Installed {} to {:?}", descriptor, install_dir);
        Ok(install_dir.join(executable_name))
    }

    /// Move the staged payload to `install_dir`.
    ///
    /// Returns `Some` when another process completed the same install first.
    /// A leftover directory at `install_dir` is moved into `staging` and
    /// never deleted in place, so a complete install is never removed.
    fn commit(
        &self,
        descriptor: &ReleaseDescriptor,
        payload: &Path,
        install_dir: &Path,
        staging: &Path,
    ) -> Result<Option<PathBuf>> {
        if let Some(parent) = install_dir.parent() {
            self.runtime.create_dir_all(parent)?;
        }
        if self.runtime.rename(payload, install_dir).is_ok() {
            return Ok(None);
        }

        if let Some(executable) = self.installed_executable(descriptor) {
            debug!("{} was installed concurrently; using it", descriptor);
            return Ok(Some(executable));
        }

        if self.runtime.exists(install_dir) {
            warn!("Incomplete install found at {:?}, replacing it.", install_dir);
            // Another process may have moved it already
            if let Err(e) = self.runtime.rename(install_dir, &staging.join("stale")) {
                debug!("Could not move {:?} aside: {:#}", install_dir, e);
            }
        }

        match self.runtime.rename(payload, install_dir) {
            Ok(()) => Ok(None),
            Err(e) => match self.installed_executable(descriptor) {
                Some(executable) => {
                    debug!("{} was installed concurrently; using it", descriptor);
                    Ok(Some(executable))
                }
                None => Err(e)
                    .with_context(|| format!("Failed to move install into {:?}", install_dir)),
            },
        }
    }

    fn staging_dir(&self, descriptor: &ReleaseDescriptor) -> PathBuf {
        self.install_root.join(STAGING_DIR_NAME).join(format!(
            "{}-{}-{}-{}",
            descriptor.package_name,
            descriptor.version,
            descriptor.platform,
            std::process::id()
        ))
    }

    /// The executable sits at the archive root or inside a single top-level directory.
    fn locate_payload(
        &self,
        unpacked: &Path,
        executable_name: &str,
        archive_path: &Path,
    ) -> Result<PathBuf> {
        let is_payload = |dir: &Path| {
            let candidate = dir.join(executable_name);
            self.runtime.exists(&candidate) && !self.runtime.is_dir(&candidate)
        };

        if is_payload(unpacked) {
            return Ok(unpacked.to_path_buf());
        }

        let entries = self.runtime.read_dir(unpacked)?;
        if let [single] = entries.as_slice()
            && self.runtime.is_dir(single)
            && is_payload(single)
        {
            debug!("Executable found in top-level directory {:?}", single);
            return Ok(single.clone());
        }

        Err(BootstrapError::Extraction {
            archive: archive_path.to_path_buf(),
            reason: ExtractionFailure::MissingExecutable(executable_name.to_string()),
        }
        .into())
    }

    /// Remove every installed version of a package.
    /// Returns false if nothing was installed.
    #[tracing::instrument(skip(self))]
    pub fn uninstall(&self, package_name: &str) -> Result<bool> {
        let package_dir = self.package_dir(package_name);
        if !self.runtime.exists(&package_dir) {
            info!("{} is not installed in {:?}", package_name, self.install_root);
            return Ok(false);
        }

        self.runtime
            .remove_dir_all(&package_dir)
            .with_context(|| format!("Failed to remove {:?}", package_dir))?;
        info!("Removed {:?}", package_dir);
        Ok(true)
    }
}
