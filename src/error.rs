//! Failure taxonomy for the bootstrapper.
//!
//! Library functions return `anyhow::Result`; a [`BootstrapError`] is the
//! root cause of every failure the entry point needs to classify, and is
//! recovered with [`BootstrapError::find`] to choose the process exit code.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Exit code used for failures that carry no [`BootstrapError`] (I/O, bad arguments).
pub const EXIT_OTHER_FAILURE: i32 = 74;

#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The host (OS, architecture) pair has no release artifact.
    #[error("unsupported platform: os '{os}', arch '{arch}'")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("failed to download {url}: {reason}")]
    Download { url: String, reason: DownloadFailure },

    #[error("failed to extract {}: {reason}", archive.display())]
    Extraction {
        archive: PathBuf,
        reason: ExtractionFailure,
    },

    #[error("failed to execute {}: {source}", path.display())]
    Execution {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest {}: {reason}", path.display())]
    Manifest { path: PathBuf, reason: String },
}

impl BootstrapError {
    /// Exit code reported when this error terminates the process.
    ///
    /// Values follow sysexits(3) so they stay clear of the small codes
    /// native tools usually return.
    pub fn exit_code(&self) -> i32 {
        match self {
            BootstrapError::UnsupportedPlatform { .. } => 69, // EX_UNAVAILABLE
            BootstrapError::Download { .. } => 75,            // EX_TEMPFAIL
            BootstrapError::Extraction { .. } => 65,          // EX_DATAERR
            BootstrapError::Execution { .. } => 71,           // EX_OSERR
            BootstrapError::Manifest { .. } => 78,            // EX_CONFIG
        }
    }

    /// Finds the bootstrap error anywhere in an `anyhow` chain.
    pub fn find(err: &anyhow::Error) -> Option<&BootstrapError> {
        err.chain().find_map(|cause| cause.downcast_ref::<BootstrapError>())
    }
}

/// Exit code for an error that terminates the process.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    BootstrapError::find(err)
        .map(BootstrapError::exit_code)
        .unwrap_or(EXIT_OTHER_FAILURE)
}

#[derive(Debug, Clone, PartialEq)]
pub enum DownloadFailure {
    Status(u16),
    Network(String),
    EmptyBody,
    UnexpectedContentType(String),
}

impl fmt::Display for DownloadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadFailure::Status(code) => write!(f, "HTTP status {}", code),
            DownloadFailure::Network(reason) => write!(f, "network error: {}", reason),
            DownloadFailure::EmptyBody => write!(f, "server returned an empty body"),
            DownloadFailure::UnexpectedContentType(ct) => {
                write!(f, "expected an archive, got content type '{}'", ct)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionFailure {
    Malformed(String),
    MissingExecutable(String),
    UnsupportedFormat,
}

impl fmt::Display for ExtractionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionFailure::Malformed(reason) => write!(f, "malformed archive: {}", reason),
            ExtractionFailure::MissingExecutable(name) => {
                write!(f, "archive does not contain the executable '{}'", name)
            }
            ExtractionFailure::UnsupportedFormat => write!(f, "unsupported archive format"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_exit_codes_are_distinct() {
        let errors = [
            BootstrapError::UnsupportedPlatform {
                os: "plan9".into(),
                arch: "mips".into(),
            },
            BootstrapError::Download {
                url: "u".into(),
                reason: DownloadFailure::Status(404),
            },
            BootstrapError::Extraction {
                archive: PathBuf::from("a.tar.gz"),
                reason: ExtractionFailure::MissingExecutable("tool".into()),
            },
            BootstrapError::Execution {
                path: PathBuf::from("tool"),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            },
            BootstrapError::Manifest {
                path: PathBuf::from("package.json"),
                reason: "missing".into(),
            },
        ];

        let mut codes: Vec<i32> = errors.iter().map(BootstrapError::exit_code).collect();
        codes.push(EXIT_OTHER_FAILURE);
        let count = codes.len();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), count);
    }

    #[test]
    fn test_find_through_context() {
        let err: anyhow::Error = Err::<(), _>(BootstrapError::Download {
            url: "https://example.com/a.tar.gz".into(),
            reason: DownloadFailure::Status(404),
        })
        .context("installing tool 1.0.0")
        .unwrap_err();

        assert_eq!(exit_code_for(&err), 75);
        assert!(matches!(
            BootstrapError::find(&err),
            Some(BootstrapError::Download { .. })
        ));
    }

    #[test]
    fn test_other_errors_use_fallback_code() {
        let err = anyhow::anyhow!("disk full");
        assert_eq!(exit_code_for(&err), EXIT_OTHER_FAILURE);
    }

    #[test]
    fn test_display_names_the_pair() {
        let err = BootstrapError::UnsupportedPlatform {
            os: "FreeBSD".into(),
            arch: "x64".into(),
        };
        assert_eq!(
            err.to_string(),
            "unsupported platform: os 'FreeBSD', arch 'x64'"
        );
    }
}
