//! Error types for the cache store

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

/// Error type for cache store operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// I/O error during cache operations
    #[error("I/O {operation} failed: {}", path.display())]
    #[diagnostic(
        code(ciartifact::cache::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error
        path: Box<Path>,
        /// Operation that failed (e.g., "read", "write", "create")
        operation: String,
    },

    /// A stored bundle does not match the paths it is restored onto
    #[error("Corrupt cache entry {key}: {message}")]
    #[diagnostic(
        code(ciartifact::cache::corrupt),
        help("Delete the entry; it will be recreated on the next save")
    )]
    Corrupt {
        /// Key of the entry
        key: String,
        /// What is wrong with it
        message: String,
    },

    /// The blocking archive task did not complete
    #[error("Cache task failed: {message}")]
    #[diagnostic(code(ciartifact::cache::task))]
    Task {
        /// Error message from the runtime
        message: String,
    },
}

impl Error {
    /// Create an I/O error with path context
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: path.as_ref().into(),
            operation: operation.into(),
        }
    }

    /// Create a corrupt-entry error
    #[must_use]
    pub fn corrupt(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Corrupt {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl From<Error> for ciartifact_core::Error {
    fn from(e: Error) -> Self {
        Self::cache_store(e.to_string())
    }
}

/// Result type for cache store operations
pub type Result<T> = std::result::Result<T, Error>;
