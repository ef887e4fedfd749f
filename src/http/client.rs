//! HTTP client for fetching release archives.
//!
//! A download is attempted exactly once. Every failure surfaces as a
//! [`BootstrapError::Download`] naming the URL and the status or reason.

use anyhow::{Context, Result};
use log::debug;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::io::Write;

use crate::error::{BootstrapError, DownloadFailure};

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Downloads `url` into the writer returned by `create_writer`.
    ///
    /// The writer is only created once the server has answered with a
    /// successful status, so a failed request leaves nothing on disk.
    /// Returns the number of bytes written.
    #[tracing::instrument(skip(self, create_writer))]
    pub async fn download_file<W, F>(&self, url: &str, create_writer: F) -> Result<u64>
    where
        W: Write,
        F: FnOnce() -> Result<W>,
    {
        debug!("Downloading file from {}...", url);

        let fail = |reason: DownloadFailure| BootstrapError::Download {
            url: url.to_string(),
            reason,
        };

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fail(DownloadFailure::Network(e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(DownloadFailure::Status(status.as_u16())).into());
        }

        // Mirrors answer unknown paths with an HTML page and a 200
        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            && content_type.trim().to_ascii_lowercase().starts_with("text/")
        {
            return Err(fail(DownloadFailure::UnexpectedContentType(content_type.to_string())).into());
        }

        let mut writer = create_writer()?;
        let mut downloaded_bytes: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| fail(DownloadFailure::Network(e.to_string())))?
        {
            writer
                .write_all(&chunk)
                .context("Failed to write chunk to file")?;
            downloaded_bytes += chunk.len() as u64;
        }
        writer.flush().context("Failed to flush downloaded file")?;

        if downloaded_bytes == 0 {
            return Err(fail(DownloadFailure::EmptyBody).into());
        }

        debug!(
            "Downloaded {:.2} MB",
            downloaded_bytes as f64 / (1024.0 * 1024.0)
        );

        Ok(downloaded_bytes)
    }
}
