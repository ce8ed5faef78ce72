//! Error types for the render pipeline.

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::registry::RegistryError;

/// Primary error type for render operations.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The render request failed validation.
    #[error("invalid {field}: {reason}")]
    Validation {
        /// Request field that failed validation.
        field: &'static str,
        /// Human readable reason.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
    /// An image could not be downloaded.
    #[error("failed to download {locator}")]
    Download {
        /// Locator that failed.
        locator: String,
        /// Underlying failure.
        #[source]
        cause: DownloadCause,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to build http client")]
    HttpClient {
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// The encoder failed.
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// Filesystem work around a render failed.
    #[error("render io failure during {operation}")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The job registry rejected an operation.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl RenderError {
    /// Returns `true` when the failure was caused by the caller's input
    /// (invalid request or an unreachable image).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::Download { .. })
    }

    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(field: &'static str, reason: &'static str, value: Option<String>) -> Self {
        Self::Validation {
            field,
            reason,
            value,
        }
    }
}

/// Reason a single download failed.
#[derive(Debug, Error)]
pub enum DownloadCause {
    /// Network or protocol failure (including timeouts).
    #[error("network error")]
    Transport(#[source] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("http status {0}")]
    Status(u16),
    /// The body could not be written to scratch storage.
    #[error("could not write asset to scratch")]
    Io(#[source] io::Error),
}

/// Failure running the external encoder.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The encoder binary could not be started.
    #[error("failed to spawn encoder {}", binary.display())]
    Spawn {
        /// Binary that failed to start.
        binary: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The encoder terminated unsuccessfully.
    #[error("encoder exited with {status}: {stderr}")]
    Exit {
        /// How the process ended.
        status: ExitKind,
        /// Tail of the encoder's diagnostic output.
        stderr: String,
    },
    /// The encoder reported success without writing the output file.
    #[error("encoder produced no output at {}", path.display())]
    MissingOutput {
        /// Expected output location.
        path: PathBuf,
    },
}

/// How an encoder process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    /// Exited with a status code.
    Code(i32),
    /// Killed by a signal.
    Signal(i32),
    /// Neither a code nor a signal was reported.
    Unknown,
}

impl From<ExitStatus> for ExitKind {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::Code(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Self::Signal(signal);
            }
        }
        Self::Unknown
    }
}

impl Display for ExitKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(formatter, "code {code}"),
            Self::Signal(signal) => write!(formatter, "signal {signal}"),
            Self::Unknown => formatter.write_str("unknown status"),
        }
    }
}

/// Convenience alias for render results.
pub type RenderResult<T> = Result<T, RenderError>;

/// Flatten an error and its sources into a single `outer: inner` line.
#[must_use]
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut current = err.source();
    while let Some(source) = current {
        let text = source.to_string();
        if !text.is_empty() && !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        current = source.source();
    }
    message
}
