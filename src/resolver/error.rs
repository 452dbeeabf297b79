//! Failure outcomes of a single resolution.

use thiserror::Error;

use crate::search::SearchError;

/// Why `resolve` produced no usable URL.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The primary search returned nothing. Also counted as a possible block.
    #[error("no results for '{phrase}'\n  Suggestion: check the title spelling, or wait if the provider is throttling")]
    NoResults {
        /// The searched phrase.
        phrase: String,
    },

    /// Results exist, but no candidate had a usable document URL.
    #[error("no PDF found for '{phrase}' ({candidates_checked} candidates checked)")]
    NoPdfFound {
        /// The searched phrase.
        phrase: String,
        /// How many candidates were inspected.
        candidates_checked: usize,
    },

    /// The provider call itself failed.
    #[error("provider error resolving '{phrase}': {source}")]
    Provider {
        /// The searched phrase.
        phrase: String,
        /// The underlying provider error.
        #[source]
        source: SearchError,
    },
}

/// Coarse failure category of a [`ResolveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveErrorKind {
    /// See [`ResolveError::NoResults`].
    NoResults,
    /// See [`ResolveError::NoPdfFound`].
    NoPdfFound,
    /// See [`ResolveError::Provider`].
    Provider,
}

impl ResolveError {
    /// Returns the failure category.
    #[must_use]
    pub fn kind(&self) -> ResolveErrorKind {
        match self {
            Self::NoResults { .. } => ResolveErrorKind::NoResults,
            Self::NoPdfFound { .. } => ResolveErrorKind::NoPdfFound,
            Self::Provider { .. } => ResolveErrorKind::Provider,
        }
    }
}
