use anyhow::{Context, Result, anyhow};
use log::debug;
use reqwest::{
    Client,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};

use std::path::PathBuf;

use crate::{
    archive::{ArchiveExtractor, ArchiveExtractorImpl},
    download::{Downloader, HttpDownloader},
    http::HttpClient,
    install::Installer,
    manifest::{Manifest, check_version, locate_manifest},
    platform::{DefaultPlatformDetector, HostPlatform, PlatformDetector},
    release::ReleaseDescriptor,
    runtime::Runtime,
};

pub const ROOT_ENV: &str = "BINBOOT_ROOT";
pub const MANIFEST_ENV: &str = "BINBOOT_MANIFEST";
pub const HOST_ENV: &str = "BINBOOT_HOST";
pub const VERSION_ENV: &str = "BINBOOT_VERSION";

const USER_AGENT: &str = concat!("binboot/", env!("BINBOOT_BUILD_VERSION"));

/// User-supplied settings, from command line flags or the environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    pub install_root: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub host: Option<String>,
}

impl Options {
    /// Read options from `BINBOOT_*` variables; empty values count as unset.
    pub fn from_env<R: Runtime>(runtime: &R) -> Self {
        let var = |key: &str| runtime.env_var(key).ok().filter(|v| !v.is_empty());
        Self {
            install_root: var(ROOT_ENV).map(PathBuf::from),
            manifest: var(MANIFEST_ENV).map(PathBuf::from),
            host: var(HOST_ENV),
        }
    }
}

pub struct Config<R: Runtime, D: Downloader, E: ArchiveExtractor> {
    pub installer: Installer<R, D, E>,
    pub manifest: Manifest,
    pub version: String,
    pub host_platform: HostPlatform,
}

impl<R: Runtime> Config<R, HttpDownloader, ArchiveExtractorImpl> {
    pub fn new(runtime: R, options: Options) -> Result<Self> {
        Self::with_detector(runtime, options, &DefaultPlatformDetector)
    }

    pub fn with_detector(
        runtime: R,
        options: Options,
        detector: &dyn PlatformDetector,
    ) -> Result<Self> {
        let manifest_path = locate_manifest(&runtime, options.manifest)?;
        let manifest = Manifest::load(&runtime, &manifest_path)?;
        let version = version_override(&runtime)?.unwrap_or_else(|| manifest.version.clone());

        let source = manifest.release_source(options.host.as_deref())?;
        let install_root = super::paths::resolve_install_root(&runtime, options.install_root)?;
        let client = build_client(&runtime, source.is_github())?;

        let installer = Installer::new(
            runtime,
            HttpDownloader::new(HttpClient::new(client)),
            ArchiveExtractorImpl::new(),
            source,
            install_root,
        );

        Ok(Self {
            installer,
            manifest,
            version,
            host_platform: detector.detect(),
        })
    }
}

impl<R: Runtime, D: Downloader, E: ArchiveExtractor> Config<R, D, E> {
    /// The release to run on this host.
    /// Fails with `UnsupportedPlatform` when the host has no artifact.
    pub fn descriptor(&self) -> Result<ReleaseDescriptor> {
        let platform = self.host_platform.resolve()?;
        Ok(ReleaseDescriptor::new(
            self.manifest.package_name(),
            &self.version,
            platform,
        ))
    }
}

fn version_override<R: Runtime>(runtime: &R) -> Result<Option<String>> {
    match runtime.env_var(VERSION_ENV) {
        Ok(version) if !version.is_empty() => {
            check_version(VERSION_ENV, &version).map_err(|e| anyhow!(e))?;
            debug!("Version overridden by {}: {}", VERSION_ENV, version);
            Ok(Some(version))
        }
        _ => Ok(None),
    }
}

/// HTTP client with the binboot user agent.
/// `GITHUB_TOKEN` is attached only when `send_token` is set.
pub fn build_client<R: Runtime>(runtime: &R, send_token: bool) -> Result<Client> {
    let mut headers = HeaderMap::new();
    if send_token
        && let Ok(token) = runtime.env_var("GITHUB_TOKEN")
        && !token.is_empty()
    {
        let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
            .context("GITHUB_TOKEN is not a valid header value")?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);
        debug!("Using GITHUB_TOKEN for authentication");
    }

    let client = Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .build()?;
    Ok(client)
}
