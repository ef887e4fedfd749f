use crate::runtime::{Runtime, sanitize_archive_path};
use anyhow::{Context, Result};
use log::{debug, info};
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

use super::{ArchiveExtractor, malformed};

/// Extractor for .zip archives
pub struct ZipExtractor;

impl ArchiveExtractor for ZipExtractor {
    fn can_handle(&self, archive_path: &Path) -> bool {
        let name = archive_path.to_string_lossy().to_lowercase();
        name.ends_with(".zip")
    }

    fn extract<R: Runtime>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<()> {
        debug!("Extracting zip archive to {:?}...", extract_to);
        let mut file = runtime
            .open(archive_path)
            .with_context(|| format!("Failed to open archive at {:?}", archive_path))?;

        // ZipArchive needs Read + Seek; Runtime::open only gives Read
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read archive {:?}", archive_path))?;

        let mut archive = ZipArchive::new(std::io::Cursor::new(buffer))
            .map_err(|e| malformed(archive_path, e))?;

        let mut files = 0usize;
        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| malformed(archive_path, e))?;

            let Some(relative) = entry
                .enclosed_name()
                .and_then(|path| sanitize_archive_path(&path))
            else {
                debug!("Skipping entry with invalid path {:?}", entry.name());
                continue;
            };

            let full_path = extract_to.join(&relative);

            if entry.is_dir() {
                runtime.create_dir_all(&full_path)?;
                continue;
            }
            if entry.is_symlink() {
                debug!("Skipping symlink entry {:?}", entry.name());
                continue;
            }

            if let Some(parent) = full_path.parent() {
                runtime.create_dir_all(parent)?;
            }
            {
                let mut dest_file = runtime.create_file(&full_path)?;
                std::io::copy(&mut entry, &mut dest_file)
                    .map_err(|e| malformed(archive_path, e))?;
            }

            // Set file permissions from archive metadata (Unix only)
            #[cfg(unix)]
            if let Some(mode) = entry.unix_mode()
                && let Err(e) = runtime.set_permissions(&full_path, mode & 0o7777)
            {
                debug!("Failed to set permissions on {:?}: {}", full_path, e);
            }

            files += 1;
        }

        if files == 0 {
            return Err(malformed(archive_path, "archive contains no files"));
        }

        info!("Extracted {} file(s).", files);
        Ok(())
    }
}
