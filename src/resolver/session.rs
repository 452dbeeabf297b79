//! Per-entry resolution session: consistency tracking plus status reporting.

use tracing::debug;

use super::consistency::{ConsistencyTracker, ConsistencyWarning};
use crate::report::{Reporter, StatusEvent};

/// Field name for titles.
pub const FIELD_TITLE: &str = "Title";
/// Field name for the main authors.
pub const FIELD_AUTHORS: &str = "Authors";
/// Field name for publication years.
pub const FIELD_YEAR: &str = "Year";
/// Field name for candidate document URLs.
pub const FIELD_PDF: &str = "PDF";
/// Field name for landing page URLs.
pub const FIELD_URL: &str = "URL";
/// Field name for the cluster a fallback candidate came from.
pub const FIELD_CLUSTER: &str = "Cluster";
/// Field name for the final destination path.
pub const FIELD_COPIED_TO: &str = "Copied to";

/// State of the entry currently being resolved.
///
/// One session lives for the whole batch; [`ResolutionSession::begin`]
/// resets it for each entry.
pub struct ResolutionSession<'a> {
    tracker: ConsistencyTracker,
    reporter: &'a dyn Reporter,
    key: Option<String>,
    warnings: Vec<String>,
}

impl<'a> ResolutionSession<'a> {
    /// Creates a session that reports to `reporter`.
    #[must_use]
    pub fn new(reporter: &'a dyn Reporter) -> Self {
        Self {
            tracker: ConsistencyTracker::new(),
            reporter,
            key: None,
            warnings: Vec::new(),
        }
    }

    /// Starts a new entry, clearing all recorded values.
    pub fn begin(&mut self, key: &str) {
        self.tracker.clear();
        self.warnings.clear();
        self.key = Some(key.to_string());
        self.reporter.report(&StatusEvent::Title {
            key: key.to_string(),
        });
    }

    /// Records and reports a value taken from the bibliography entry.
    pub fn query(&mut self, field: &str, value: Option<&str>) {
        let Some(value) = value else {
            return;
        };
        self.tracker.record_query(field, value);
        self.reporter.report(&StatusEvent::Query {
            field: field.to_string(),
            value: value.to_string(),
        });
    }

    /// Records and reports a provider value; reports a warning on mismatch.
    pub fn result(&mut self, field: &str, value: Option<&str>) -> Option<ConsistencyWarning> {
        let value = value?;
        let mismatch = self.tracker.record_result(field, value);
        self.reporter.report(&StatusEvent::Result {
            field: field.to_string(),
            value: value.to_string(),
        });
        if let Some(mismatch) = &mismatch {
            debug!(field, similarity = mismatch.similarity, "consistency mismatch");
            self.warning(&mismatch.to_string());
        }
        mismatch
    }

    /// Reports a value without consistency tracking.
    pub fn info(&self, field: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.reporter.report(&StatusEvent::Result {
                field: field.to_string(),
                value: value.to_string(),
            });
        }
    }

    /// Reports an advisory warning.
    pub fn warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
        self.reporter.report(&StatusEvent::Warning {
            message: message.to_string(),
        });
    }

    /// Reports an entry failure.
    pub fn error(&self, message: &str) {
        self.reporter.report(&StatusEvent::Error {
            message: message.to_string(),
        });
    }

    /// Ends the current entry.
    pub fn finish(&mut self) {
        self.tracker.clear();
        if let Some(key) = self.key.take() {
            self.reporter.report(&StatusEvent::Finished { key });
        }
    }

    /// Key of the entry in progress.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Warnings reported since the last [`begin`](Self::begin).
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

impl std::fmt::Debug for ResolutionSession<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionSession")
            .field("key", &self.key)
            .field("tracker", &self.tracker)
            .field("warnings", &self.warnings)
            .finish_non_exhaustive()
    }
}
