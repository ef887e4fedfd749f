use crate::runtime::{Runtime, is_contained_link_target, sanitize_archive_path};
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use log::{debug, info, warn};
use std::path::Path;
use tar::Archive;

use super::{ArchiveExtractor, malformed};

/// Extractor for .tar.gz / .tgz archives
pub struct TarGzExtractor;

impl ArchiveExtractor for TarGzExtractor {
    fn can_handle(&self, archive_path: &Path) -> bool {
        let name = archive_path.to_string_lossy().to_lowercase();
        name.ends_with(".tar.gz") || name.ends_with(".tgz")
    }

    fn extract<R: Runtime>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<()> {
        debug!("Extracting tar.gz archive to {:?}...", extract_to);
        let file = runtime
            .open(archive_path)
            .with_context(|| format!("Failed to open archive at {:?}", archive_path))?;

        let mut archive = Archive::new(GzDecoder::new(file));
        let entries = archive
            .entries()
            .map_err(|e| malformed(archive_path, e))?;

        let mut files = 0usize;
        for entry in entries {
            let mut entry = entry.map_err(|e| malformed(archive_path, e))?;
            let entry_path = entry
                .path()
                .map_err(|e| malformed(archive_path, e))?
                .into_owned();

            let Some(relative) = sanitize_archive_path(&entry_path) else {
                debug!("Skipping entry with unsafe path {:?}", entry_path);
                continue;
            };
            let full_path = extract_to.join(&relative);
            let entry_type = entry.header().entry_type();

            if entry_type.is_dir() {
                runtime.create_dir_all(&full_path)?;
            } else if entry_type.is_file() {
                if let Some(parent) = full_path.parent() {
                    runtime.create_dir_all(parent)?;
                }
                let mode = entry.header().mode().ok();
                {
                    let mut dest_file = runtime.create_file(&full_path)?;
                    std::io::copy(&mut entry, &mut dest_file)
                        .map_err(|e| malformed(archive_path, e))?;
                }

                // Preserve the archived mode; the installer still forces the executable bit
                #[cfg(unix)]
                if let Some(mode) = mode
                    && let Err(e) = runtime.set_permissions(&full_path, mode & 0o7777)
                {
                    debug!("Failed to set permissions on {:?}: {}", full_path, e);
                }
                #[cfg(not(unix))]
                let _ = mode;

                files += 1;
            } else if entry_type.is_symlink() {
                let target = entry
                    .link_name()
                    .map_err(|e| malformed(archive_path, e))?
                    .map(|target| target.into_owned());
                let Some(target) = target.filter(|t| is_contained_link_target(t)) else {
                    debug!("Skipping symlink {:?} with unsafe target", entry_path);
                    continue;
                };
                if let Some(parent) = full_path.parent() {
                    runtime.create_dir_all(parent)?;
                }
                if let Err(e) = runtime.symlink(&target, &full_path) {
                    warn!("Skipping symlink {:?} -> {:?}: {:#}", entry_path, target, e);
                    continue;
                }
                files += 1;
            } else {
                debug!("Skipping {:?} entry {:?}", entry_type, entry_path);
            }
        }

        if files == 0 {
            return Err(malformed(archive_path, "archive contains no files"));
        }

        info!("Extracted {} file(s).", files);
        Ok(())
    }
}
