//! Error types for capture and decode operations.
//!
//! All errors implement the `std::error::Error` trait and carry structured
//! context. The taxonomy follows the propagation policy of the pipeline:
//!
//! - **Transport status codes** are *not* errors at this level — the frame
//!   assembler absorbs them into per-frame bookkeeping and carries on.
//! - **Decode errors** ([`CaptureError::LayoutMismatch`],
//!   [`CaptureError::TruncatedRecord`]) always propagate to the caller that
//!   requested the decode; partial data is never silently zero-filled.
//! - **Startup errors** (session directory creation, serial port open) are
//!   fatal to the worker that hit them; there are no automatic retries.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for capture and decode operations.
pub type Result<T, E = CaptureError> = std::result::Result<T, E>;

/// Main error type for capture and decode operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CaptureError {
    /// A record slice did not match the layout's expected length.
    #[error("record layout mismatch: expected {expected} bytes, got {actual}")]
    LayoutMismatch { expected: usize, actual: usize },

    /// A session file ended with a non-empty partial record.
    #[error("truncated record at end of file: expected {expected} bytes, got {actual}")]
    TruncatedRecord { expected: usize, actual: usize },

    /// File or directory operation failed.
    #[error("file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Transport could not be opened or closed cleanly.
    #[error("transport error on {port}: {reason}")]
    Transport {
        port: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration could not be parsed or is inconsistent.
    #[error("configuration error: {details}")]
    Config { details: String },

    /// An analysis helper was called with invalid arguments.
    #[error("invalid argument: {details}")]
    InvalidArgument { details: String },
}

impl CaptureError {
    /// Whether this error aborts its worker or pipeline stage.
    ///
    /// Decode-level errors are fatal only to the single decode call that
    /// produced them; everything filesystem- or transport-shaped takes the
    /// worker down at startup.
    pub fn is_fatal(&self) -> bool {
        match self {
            CaptureError::LayoutMismatch { .. } => false,
            CaptureError::TruncatedRecord { .. } => false,
            CaptureError::File { .. } => true,
            CaptureError::Transport { .. } => true,
            CaptureError::Config { .. } => true,
            CaptureError::InvalidArgument { .. } => false,
        }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CaptureError::File { path: path.into(), source }
    }

    /// Helper constructor for transport errors.
    pub fn transport_failed(port: impl Into<String>, reason: impl Into<String>) -> Self {
        CaptureError::Transport { port: port.into(), reason: reason.into(), source: None }
    }

    /// Helper constructor for transport errors with an underlying cause.
    pub fn transport_failed_with_source(
        port: impl Into<String>,
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        CaptureError::Transport { port: port.into(), reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(details: impl Into<String>) -> Self {
        CaptureError::Config { details: details.into() }
    }

    /// Helper constructor for invalid-argument errors.
    pub fn invalid_argument(details: impl Into<String>) -> Self {
        CaptureError::InvalidArgument { details: details.into() }
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}
