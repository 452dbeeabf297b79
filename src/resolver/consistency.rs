//! Cross-checking of query and result values within one resolution session.

use std::collections::HashMap;
use std::fmt;

/// Where the conflicting value was first seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchKind {
    /// The result disagrees with what was searched for.
    Query,
    /// The result disagrees with an earlier result for the same field.
    EarlierResult,
}

/// A mismatch detected by [`ConsistencyTracker::record_result`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConsistencyWarning {
    /// Field name, e.g. `Title`.
    pub field: String,
    /// Which recorded value the new result was compared against.
    pub kind: MismatchKind,
    /// The recorded value.
    pub expected: String,
    /// The newly observed value.
    pub actual: String,
    /// Normalized Levenshtein similarity of the two normalized values, 0.0 to 1.0.
    pub similarity: f64,
}

impl fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self.kind {
            MismatchKind::Query => "query",
            MismatchKind::EarlierResult => "earlier result",
        };
        write!(
            f,
            "{} differs from {source}: expected '{}', got '{}' (similarity {:.2})",
            self.field, self.expected, self.actual, self.similarity
        )
    }
}

/// Per-entry store of query and result values.
#[derive(Debug, Default, Clone)]
pub struct ConsistencyTracker {
    queries: HashMap<String, String>,
    results: HashMap<String, String>,
}

impl ConsistencyTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the value searched for in `field`.
    pub fn record_query(&mut self, field: &str, value: &str) {
        self.queries.insert(field.to_string(), value.to_string());
    }

    /// Records a value reported by the provider for `field`.
    ///
    /// The first dissimilar comparison wins: a stored query value is checked
    /// before an earlier result. An unseen field is stored without comment.
    pub fn record_result(&mut self, field: &str, value: &str) -> Option<ConsistencyWarning> {
        if let Some(expected) = self.queries.get(field) {
            if !similar(expected, value) {
                return Some(warning(field, MismatchKind::Query, expected, value));
            }
        } else if let Some(expected) = self.results.get(field) {
            if !similar(expected, value) {
                return Some(warning(field, MismatchKind::EarlierResult, expected, value));
            }
        } else {
            self.results.insert(field.to_string(), value.to_string());
        }
        None
    }

    /// Forgets everything; called at the start of each entry.
    pub fn clear(&mut self) {
        self.queries.clear();
        self.results.clear();
    }

    /// Returns true if no values are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty() && self.results.is_empty()
    }
}

/// Compares two values after trimming, case folding and dropping everything
/// except word characters.
///
/// Word characters are Unicode letters and digits plus `_`, so an underscore
/// is significant: `Foo_Bar` and `FooBar` are not similar.
#[must_use]
pub fn similar(lhs: &str, rhs: &str) -> bool {
    normalize(lhs) == normalize(rhs)
}

fn normalize(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn warning(field: &str, kind: MismatchKind, expected: &str, actual: &str) -> ConsistencyWarning {
    ConsistencyWarning {
        field: field.to_string(),
        kind,
        expected: expected.to_string(),
        actual: actual.to_string(),
        similarity: strsim::normalized_levenshtein(&normalize(expected), &normalize(actual)),
    }
}
