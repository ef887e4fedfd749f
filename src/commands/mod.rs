use anyhow::Result;
use log::info;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::{
    archive::ArchiveExtractor, cleanup, download::Downloader, proxy, runtime::Runtime,
};

pub mod config;
mod paths;

pub use config::{Config, Options};
pub use paths::{default_install_root, resolve_install_root};

/// Post-install step: make sure the binary for this host is on disk.
#[tracing::instrument(skip(runtime))]
pub async fn install<R: Runtime + 'static>(runtime: R, options: Options) -> Result<PathBuf> {
    let config = Config::new(runtime, options)?;
    ensure_installed(&config).await
}

/// Install if needed and run the binary, returning its exit code.
#[tracing::instrument(skip(runtime, args))]
pub async fn run<R: Runtime + 'static>(
    runtime: R,
    options: Options,
    args: Vec<OsString>,
) -> Result<i32> {
    let config = Config::new(runtime, options)?;
    let descriptor = config.descriptor()?;
    proxy::run(&config.installer, &descriptor, &args).await
}

/// Install if needed and print the executable path.
#[tracing::instrument(skip(runtime))]
pub async fn path<R: Runtime + 'static>(runtime: R, options: Options) -> Result<()> {
    let executable = install(runtime, options).await?;
    println!("{}", executable.display());
    Ok(())
}

/// Remove every installed version of the package.
#[tracing::instrument(skip(runtime))]
pub fn uninstall<R: Runtime + 'static>(runtime: R, options: Options) -> Result<()> {
    let config = Config::new(runtime, options)?;
    let package = config.manifest.package_name();
    if config.installer.uninstall(package)? {
        println!("Removed {}", package);
    } else {
        println!("{} is not installed", package);
    }
    Ok(())
}

async fn ensure_installed<R: Runtime, D: Downloader, E: ArchiveExtractor>(
    config: &Config<R, D, E>,
) -> Result<PathBuf> {
    let descriptor = config.descriptor()?;
    let executable = cleanup::with_interrupt_cleanup(
        config.installer.cleanup_context(),
        config.installer.ensure_installed(&descriptor),
    )
    .await?;
    info!("{} is ready at {:?}", descriptor, executable);
    Ok(executable)
}
