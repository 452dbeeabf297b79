//! Candidate URL classification.
//!
//! Classification looks at the URL host only. A blacklisted word appearing in
//! a path or query string never rejects a candidate.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use thiserror::Error;
use tracing::debug;

use super::utils::extract_host;

/// Hosts whose documents are never accepted unless configured otherwise.
pub const DEFAULT_BLACKLIST: &[&str] = &["springer", "academia", "semanticscholar"];

/// Hosts that indicate a book catalog rather than a paper.
pub const DEFAULT_BOOK_HOSTS: &[&str] = &[r"books\.google\."];

#[allow(clippy::expect_used)]
static DEFAULT_FILTER: LazyLock<CandidateFilter> = LazyLock::new(|| {
    CandidateFilter::from_patterns(DEFAULT_BLACKLIST, DEFAULT_BOOK_HOSTS)
        .expect("default host patterns are valid")
});

/// Verdict for one candidate URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The host is acceptable.
    Usable,
    /// The host matched a blacklist pattern.
    Blacklisted,
}

/// Errors raised while building a [`CandidateFilter`].
#[derive(Debug, Error)]
pub enum FilterError {
    /// A configured host pattern is not a valid regex.
    #[error("invalid host pattern '{pattern}': {source}\n  Suggestion: check the blacklist/book_hosts entries in your config file")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// The regex compile error.
        #[source]
        source: regex::Error,
    },
}

/// Host-based candidate filter.
#[derive(Debug, Clone)]
pub struct CandidateFilter {
    blacklist: Vec<Regex>,
    book_hosts: Vec<Regex>,
}

impl CandidateFilter {
    /// Creates a filter from compiled patterns.
    #[must_use]
    pub fn new(blacklist: Vec<Regex>, book_hosts: Vec<Regex>) -> Self {
        Self {
            blacklist,
            book_hosts,
        }
    }

    /// Compiles case-insensitive host patterns.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidPattern`] for the first pattern that fails to compile.
    pub fn from_patterns<B, K>(blacklist: B, book_hosts: K) -> Result<Self, FilterError>
    where
        B: IntoIterator,
        B::Item: AsRef<str>,
        K: IntoIterator,
        K::Item: AsRef<str>,
    {
        Ok(Self {
            blacklist: compile_patterns(blacklist)?,
            book_hosts: compile_patterns(book_hosts)?,
        })
    }

    /// Classifies a candidate URL by its host.
    #[must_use]
    pub fn classify(&self, url: &str) -> Classification {
        match extract_host(url) {
            Some(host) if self.blacklist.iter().any(|re| re.is_match(&host)) => {
                debug!(host = %host, "candidate host is blacklisted");
                Classification::Blacklisted
            }
            _ => Classification::Usable,
        }
    }

    /// Returns true if the URL's host matches a blacklist pattern.
    #[must_use]
    pub fn is_blacklisted(&self, url: &str) -> bool {
        self.classify(url) == Classification::Blacklisted
    }

    /// Returns true for a present, non-blacklisted URL.
    #[must_use]
    pub fn is_usable(&self, url: Option<&str>) -> bool {
        url.is_some_and(|url| !url.trim().is_empty() && !self.is_blacklisted(url))
    }

    /// Returns true when the URL is absent or points at a book catalog.
    #[must_use]
    pub fn looks_like_book(&self, url: Option<&str>) -> bool {
        let Some(url) = url else {
            return true;
        };
        extract_host(url).is_some_and(|host| self.book_hosts.iter().any(|re| re.is_match(&host)))
    }
}

impl Default for CandidateFilter {
    /// The built-in blacklist and book catalog hosts.
    fn default() -> Self {
        DEFAULT_FILTER.clone()
    }
}

fn compile_patterns<I>(patterns: I) -> Result<Vec<Regex>, FilterError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    patterns
        .into_iter()
        .map(|pattern| {
            let pattern = pattern.as_ref();
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|source| FilterError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })
        })
        .collect()
}
