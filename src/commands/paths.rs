use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use crate::runtime::Runtime;

/// Resolve the install root: an explicit path, else the default location.
#[tracing::instrument(skip(runtime))]
pub fn resolve_install_root<R: Runtime>(
    runtime: &R,
    install_root: Option<PathBuf>,
) -> Result<PathBuf> {
    let root = match install_root {
        Some(path) => path,
        None => default_install_root(runtime)?,
    };
    let root = std::path::absolute(&root)
        .with_context(|| format!("Invalid install root {:?}", root))?;

    info!("Using install root: {}", root.display());
    Ok(root)
}

/// Get the default installation root directory
#[tracing::instrument(skip(runtime))]
pub fn default_install_root<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    if let Some(cache_dir) = runtime.cache_dir() {
        return Ok(cache_dir.join("binboot"));
    }
    let home_dir = runtime
        .home_dir()
        .context("Could not find a cache or home directory")?;
    Ok(home_dir.join(".binboot"))
}
