//! Error types for search provider calls.

use thiserror::Error;

/// Errors returned by a [`SearchProvider`](super::SearchProvider).
#[derive(Debug, Error)]
pub enum SearchError {
    /// Transport failure (DNS, connection refused, TLS, broken body).
    #[error("network error querying {url}: {source}")]
    Network {
        /// The request URL.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before a response arrived.
    #[error("timeout querying {url}")]
    Timeout {
        /// The request URL.
        url: String,
    },

    /// Non-success HTTP status that is not a block signal.
    #[error("HTTP {status} querying {url}")]
    HttpStatus {
        /// The request URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The provider refused service (rate limit, captcha, sorry page).
    #[error("provider blocked request to {url}: {reason}\n  Suggestion: wait before retrying or increase --delay-ms")]
    Blocked {
        /// The request URL.
        url: String,
        /// What gave the block away.
        reason: String,
    },

    /// The request could not be built or the client could not be constructed.
    #[error("invalid search request: {reason}")]
    InvalidRequest {
        /// Why the request is invalid.
        reason: String,
    },
}

impl SearchError {
    /// Creates a network error, promoting reqwest timeouts to [`SearchError::Timeout`].
    #[must_use]
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates an HTTP status error.
    #[must_use]
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a block error.
    #[must_use]
    pub fn blocked(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Blocked {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid request error.
    #[must_use]
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Returns true when the provider explicitly signalled blocking.
    #[must_use]
    pub fn is_block_signal(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}
