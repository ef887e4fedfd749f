mod tar_gz;
mod zip;

use crate::error::{BootstrapError, ExtractionFailure};
use crate::runtime::Runtime;
use anyhow::Result;
use std::path::Path;

pub use tar_gz::TarGzExtractor;
pub use zip::ZipExtractor;

/// Trait for format-specific archive extractors
pub trait ArchiveExtractor: Send + Sync {
    /// Check if this extractor can handle the given archive format
    fn can_handle(&self, archive_path: &Path) -> bool;

    /// Extract every entry of the archive below `extract_to`.
    /// Entries whose paths would escape `extract_to` are skipped. Tar symlinks
    /// are recreated when their target is relative and stays below the link's
    /// directory; other links, and symlinks in zip archives, are skipped.
    fn extract<R: Runtime>(&self, runtime: &R, archive_path: &Path, extract_to: &Path)
    -> Result<()>;
}

/// Dispatcher that selects the appropriate extractor based on archive format.
pub struct ArchiveExtractorImpl {
    tar_gz: TarGzExtractor,
    zip: ZipExtractor,
}

impl Default for ArchiveExtractorImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveExtractorImpl {
    pub fn new() -> Self {
        Self {
            tar_gz: TarGzExtractor,
            zip: ZipExtractor,
        }
    }
}

impl ArchiveExtractor for ArchiveExtractorImpl {
    fn can_handle(&self, archive_path: &Path) -> bool {
        self.tar_gz.can_handle(archive_path) || self.zip.can_handle(archive_path)
    }

    #[tracing::instrument(skip(self, runtime, archive_path, extract_to))]
    fn extract<R: Runtime>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<()> {
        if self.tar_gz.can_handle(archive_path) {
            return self.tar_gz.extract(runtime, archive_path, extract_to);
        }
        if self.zip.can_handle(archive_path) {
            return self.zip.extract(runtime, archive_path, extract_to);
        }
        Err(BootstrapError::Extraction {
            archive: archive_path.to_path_buf(),
            reason: ExtractionFailure::UnsupportedFormat,
        }
        .into())
    }
}

/// Error for an archive that cannot be decoded.
pub(crate) fn malformed(archive_path: &Path, reason: impl std::fmt::Display) -> anyhow::Error {
    BootstrapError::Extraction {
        archive: archive_path.to_path_buf(),
        reason: ExtractionFailure::Malformed(reason.to_string()),
    }
    .into()
}
