//! Error types for artifact resolution

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

/// Error type for every resolution stage
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The CI service answered with an unexpected status or could not be reached
    #[error("{operation} failed for {repository}{}: {message}", status.map_or(String::new(), |s| format!(" (HTTP {s})")))]
    #[diagnostic(
        code(ciartifact::remote),
        help("Check the repository name, the token scopes (`repo`, `actions:read`) and network access")
    )]
    Remote {
        /// What was being requested (e.g. "fetch repository HEAD")
        operation: String,
        /// Repository the request was issued against
        repository: String,
        /// HTTP status, when a response was received
        status: Option<u16>,
        /// Underlying message
        message: String,
    },

    /// Filtering left nothing to select
    #[error("No {what} found: {detail}")]
    #[diagnostic(
        code(ciartifact::not_found),
        help("No build has succeeded yet for this commit, or it published under another name")
    )]
    NotFound {
        /// Kind of thing that was looked for (run, artifact, head ref)
        what: String,
        /// Context identifying the query
        detail: String,
        /// Failure that caused the empty result, if any
        #[source]
        source: Option<Box<Error>>,
    },

    /// Unpacking the outer or inner archive failed
    #[error("Extraction failed: {message}{}", path.as_ref().map_or(String::new(), |p| format!(" ({})", p.display())))]
    #[diagnostic(code(ciartifact::extraction))]
    Extraction {
        /// What went wrong
        message: String,
        /// Path involved, if any
        path: Option<Box<Path>>,
        /// Underlying I/O error, if any
        #[source]
        source: Option<std::io::Error>,
    },

    /// A directory offered to the cache was empty
    #[error("Empty target dir, skipping saving cache: {}", path.display())]
    #[diagnostic(
        code(ciartifact::empty_content),
        help("Nothing was installed into the directory; refusing to publish an empty cache entry")
    )]
    EmptyContent {
        /// Directory that measured zero bytes
        path: Box<Path>,
    },

    /// Invalid input or settings
    #[error("Configuration error: {message}")]
    #[diagnostic(code(ciartifact::config))]
    Configuration {
        /// Error message describing the configuration issue
        message: String,
    },

    /// I/O error outside of archive extraction
    #[error("I/O {operation} failed: {}", path.display())]
    #[diagnostic(
        code(ciartifact::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error
        path: Box<Path>,
        /// Operation that failed (e.g., "read", "measure")
        operation: String,
    },

    /// The external cache store failed
    #[error("Cache store error: {message}")]
    #[diagnostic(code(ciartifact::cache_store))]
    CacheStore {
        /// Error message reported by the store
        message: String,
    },
}

impl Error {
    /// Create a remote error
    #[must_use]
    pub fn remote(
        operation: impl Into<String>,
        repository: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::Remote {
            operation: operation.into(),
            repository: repository.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a not-found error
    #[must_use]
    pub fn not_found(what: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::NotFound {
            what: what.into(),
            detail: detail.into(),
            source: None,
        }
    }

    /// Create a not-found error caused by another failure
    #[must_use]
    pub fn not_found_caused_by(
        what: impl Into<String>,
        detail: impl Into<String>,
        source: Self,
    ) -> Self {
        Self::NotFound {
            what: what.into(),
            detail: detail.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an extraction error without an I/O source
    #[must_use]
    pub fn extraction(message: impl Into<String>, path: Option<&Path>) -> Self {
        Self::Extraction {
            message: message.into(),
            path: path.map(Into::into),
            source: None,
        }
    }

    /// Create an extraction error from an I/O failure at `path`
    #[must_use]
    pub fn extraction_io(
        message: impl Into<String>,
        path: impl AsRef<Path>,
        source: std::io::Error,
    ) -> Self {
        Self::Extraction {
            message: message.into(),
            path: Some(path.as_ref().into()),
            source: Some(source),
        }
    }

    /// Create an empty-content error
    #[must_use]
    pub fn empty_content(path: impl AsRef<Path>) -> Self {
        Self::EmptyContent {
            path: path.as_ref().into(),
        }
    }

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
            path: path.as_ref().into(),
            operation: operation.into(),
        }
    }

    /// Create a cache store error
    #[must_use]
    pub fn cache_store(msg: impl Into<String>) -> Self {
        Self::CacheStore {
            message: msg.into(),
        }
    }

    /// Whether this is a not-found outcome rather than a hard failure
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for artifact resolution
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_mentions_status_and_repository() {
        let err = Error::remote("fetch workflow runs", "x/y", Some(404), "Not Found");
        let msg = err.to_string();
        assert!(msg.contains("x/y"));
        assert!(msg.contains("HTTP 404"));
        assert!(msg.contains("Not Found"));
    }

    #[test]
    fn remote_error_without_status() {
        let err = Error::remote("fetch repository HEAD", "x/y", None, "connection refused");
        assert!(!err.to_string().contains("HTTP"));
    }

    #[test]
    fn not_found_keeps_cause() {
        let cause = Error::remote("fetch workflow runs", "x/y", Some(500), "boom");
        let err = Error::not_found_caused_by("workflow runs", "x/y@main", cause);
        assert!(err.is_not_found());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn extraction_error_includes_path() {
        let err = Error::extraction("inner archive missing", Some(Path::new("/tmp/a.tar")));
        assert!(err.to_string().contains("/tmp/a.tar"));
    }
}
