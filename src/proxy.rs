//! Execution proxy: run the installed binary as if it had been invoked directly.

use anyhow::Result;
use log::debug;
use std::convert::Infallible;
use std::ffi::OsString;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;

use crate::archive::ArchiveExtractor;
use crate::cleanup;
use crate::download::Downloader;
use crate::error::BootstrapError;
use crate::install::Installer;
use crate::release::ReleaseDescriptor;
use crate::runtime::Runtime;

/// Install `descriptor` if needed, then run it with `args`.
/// Returns the child's exit code. Ctrl-C during the install removes staging
/// and exits with 130.
#[tracing::instrument(skip(installer, args))]
pub async fn run<R: Runtime, D: Downloader, E: ArchiveExtractor>(
    installer: &Installer<R, D, E>,
    descriptor: &ReleaseDescriptor,
    args: &[OsString],
) -> Result<i32> {
    let executable = cleanup::with_interrupt_cleanup(
        installer.cleanup_context(),
        installer.ensure_installed(descriptor),
    )
    .await?;
    debug!("{} is ready at {:?}", descriptor, executable);
    execute(&executable, args).await
}

/// Spawn `executable` with inherited stdio and wait for it.
pub async fn execute(executable: &Path, args: &[OsString]) -> Result<i32> {
    let execution_error = |source| BootstrapError::Execution {
        path: executable.to_path_buf(),
        source,
    };

    debug!("Executing {:?} with {} argument(s)", executable, args.len());
    let mut child = Command::new(executable)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(execution_error)?;

    // The child gets the terminal's Ctrl-C too; it decides what happens
    let status = tokio::select! {
        status = child.wait() => status.map_err(execution_error)?,
        never = ignore_interrupts() => match never {},
    };

    let code = exit_code(status);
    debug!("{:?} exited with {}", executable, code);
    Ok(code)
}

/// Swallow Ctrl-C for as long as it is polled.
async fn ignore_interrupts() -> Infallible {
    loop {
        if tokio::signal::ctrl_c().await.is_err() {
            // No handler could be installed; the default disposition applies
            std::future::pending::<()>().await;
        }
        debug!("Interrupt received, waiting for the child to exit");
    }
}

/// Exit code to report for a finished child.
/// A Unix child killed by signal `N` maps to `128 + N`, as shells report it.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}
