//! Error types for sourcemark.
//!
//! Library crates use [`SourcemarkError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all sourcemark operations.
#[derive(Debug, thiserror::Error)]
pub enum SourcemarkError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Zip container cannot be read, extracted, or written.
    #[error("archive error: {0}")]
    Archive(String),

    /// HTML parsing or document query error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// QR code synthesis or PNG encoding error.
    #[error("qr error: {0}")]
    Qr(String),

    /// `ebook-convert` invocation failure.
    #[error("convert error: {0}")]
    Convert(String),

    /// `calibre-smtp` invocation failure.
    #[error("delivery error: {0}")]
    Delivery(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SourcemarkError>;

impl SourcemarkError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create an archive error from any displayable message.
    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive(msg.into())
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
