use crate::http::HttpClient;
use crate::runtime::Runtime;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;
use std::path::Path;

/// Fetches a release archive to a local file.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `url` to `dest`. `dest` is only created after the server
    /// has accepted the request. Returns the number of bytes written.
    async fn download<R: Runtime>(&self, runtime: &R, url: &str, dest: &Path) -> Result<u64>;
}

/// Downloader backed by the HTTP client
pub struct HttpDownloader {
    http_client: HttpClient,
}

impl HttpDownloader {
    pub fn new(http_client: HttpClient) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    #[tracing::instrument(skip(self, runtime, dest))]
    async fn download<R: Runtime>(&self, runtime: &R, url: &str, dest: &Path) -> Result<u64> {
        info!("Downloading {}...", url);

        let bytes = self
            .http_client
            .download_file(url, || {
                runtime
                    .create_file(dest)
                    .with_context(|| format!("Failed to create download file at {:?}", dest))
            })
            .await?;

        info!("Download complete.");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use reqwest::Client;

    #[tokio::test]
    async fn test_download() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/tool-linux.tar.gz")
            .with_status(200)
            .with_body("test content")
            .create_async()
            .await;

        let mut runtime = MockRuntime::new();

        // Create file: tool-linux.tar.gz -> returns sink (discards content)
        runtime
            .expect_create_file()
            .with(mockall::predicate::eq(
                Path::new("tool-linux.tar.gz").to_path_buf(),
            ))
            .times(1)
            .returning(|_| Ok(Box::new(std::io::sink())));

        let downloader = HttpDownloader::new(HttpClient::new(Client::new()));
        let bytes = downloader
            .download(
                &runtime,
                &format!("{}/tool-linux.tar.gz", url),
                Path::new("tool-linux.tar.gz"),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(bytes, 12);
    }

    #[tokio::test]
    async fn test_download_not_found_creates_nothing() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/tool-linux.tar.gz")
            .with_status(404)
            .create_async()
            .await;

        // No expectations = strict mode (panics if any method called)
        let runtime = MockRuntime::new();

        let downloader = HttpDownloader::new(HttpClient::new(Client::new()));
        let result = downloader
            .download(
                &runtime,
                &format!("{}/tool-linux.tar.gz", url),
                Path::new("tool-linux.tar.gz"),
            )
            .await;

        mock.assert_async().await;
        assert!(result.is_err());
    }
}
