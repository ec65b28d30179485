//! Error types shared across the fcache crates

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

/// Boxed error type producers may fail with
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type for cache operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// I/O error during cache operations
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(fcache::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error, if available
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "read", "write", "create")
        operation: String,
    },

    /// Configuration or validation error
    #[error("Cache configuration error: {message}")]
    #[diagnostic(code(fcache::config))]
    Configuration {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Payload could not be encoded or decoded
    #[error("Codec error: {message}")]
    #[diagnostic(
        code(fcache::codec),
        help("The cached payload may be corrupt or written by an incompatible type")
    )]
    Codec {
        /// Error message describing the codec issue
        message: String,
    },

    /// The caller-supplied producer failed
    #[error("Producer failed")]
    #[diagnostic(code(fcache::producer))]
    Producer {
        /// The error raised by the producer
        #[source]
        source: BoxedError,
    },

    /// A scope directory could not be compressed into an archive
    #[error("Failed to archive {}: {message}", path.display())]
    #[diagnostic(code(fcache::archive))]
    Archive {
        /// The directory that failed to compress
        path: Box<Path>,
        /// Error message from the archiver
        message: String,
    },
}

impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Create an I/O error with path context
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Create an I/O error without path context
    #[must_use]
    pub fn io_no_path(source: std::io::Error, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: None,
            operation: operation.into(),
        }
    }

    /// Create a codec error
    #[must_use]
    pub fn codec(msg: impl Into<String>) -> Self {
        Self::Codec {
            message: msg.into(),
        }
    }

    /// Wrap a producer failure
    #[must_use]
    pub fn producer(source: impl Into<BoxedError>) -> Self {
        Self::Producer {
            source: source.into(),
        }
    }

    /// Create an archive error
    #[must_use]
    pub fn archive(path: impl AsRef<Path>, msg: impl Into<String>) -> Self {
        Self::Archive {
            path: path.as_ref().into(),
            message: msg.into(),
        }
    }
}

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, Error>;
