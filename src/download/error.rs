//! Error types for the download module.
//!
//! Local precondition failures (missing directory, existing file) are kept
//! apart from transfer failures so the batch can tell whether the provider
//! was ever contacted for an entry.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while checking a destination or fetching a document.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The server answered with an HTML page where a document was expected.
    #[error("expected a document from {url} but got {content_type}\n  Suggestion: the host may require a login; open the URL in a browser")]
    UnexpectedContent {
        /// The requested URL.
        url: String,
        /// The Content-Type the server sent.
        content_type: String,
    },

    /// File system error during download (create file, write, etc.)
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The output directory does not exist or is not a directory.
    #[error("output directory {dir} does not exist or is not a directory\n  Suggestion: create it first or pass --output-dir")]
    DestinationMissing {
        /// The expected directory.
        dir: PathBuf,
    },

    /// The destination file exists and overwriting is disabled.
    #[error("{path} already exists\n  Suggestion: pass --force to overwrite")]
    AlreadyExists {
        /// The existing file.
        path: PathBuf,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build download client: {reason}")]
    ClientBuild {
        /// Why construction failed.
        reason: String,
    },
}

impl DownloadError {
    /// Creates a network error, promoting reqwest timeouts to [`DownloadError::Timeout`].
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Returns true for failures detected on the local file system before any transfer.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::DestinationMissing { .. } | Self::AlreadyExists { .. } | Self::Io { .. }
        )
    }
}
