//! Status events emitted while resolving a bibliography, and the sink that receives them.
//!
//! The library never prints. Everything a user sees about an entry (what was
//! searched for, what the provider answered, warnings) flows through a
//! [`Reporter`]; the binary renders events as text or JSON lines.

use serde::Serialize;
use tracing::{error, info, warn};

/// One status line for the current entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StatusEvent {
    /// Processing of a new entry starts.
    Title {
        /// Bibliography key.
        key: String,
    },
    /// A value taken from the bibliography entry.
    Query {
        /// Field name.
        field: String,
        /// Field value.
        value: String,
    },
    /// A value reported by the provider or produced by the tool.
    Result {
        /// Field name.
        field: String,
        /// Field value.
        value: String,
    },
    /// Advisory, the entry continues.
    Warning {
        /// Message text.
        message: String,
    },
    /// The entry failed.
    Error {
        /// Message text.
        message: String,
    },
    /// Processing of an entry ended.
    Finished {
        /// Bibliography key.
        key: String,
    },
}

/// Receiver of [`StatusEvent`]s.
pub trait Reporter: Send + Sync {
    /// Handles one event.
    fn report(&self, event: &StatusEvent);
}

impl<F> Reporter for F
where
    F: Fn(&StatusEvent) + Send + Sync,
{
    fn report(&self, event: &StatusEvent) {
        self(event);
    }
}

/// Reporter that forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: &StatusEvent) {
        match event {
            StatusEvent::Title { key } => info!(key = %key, "processing entry"),
            StatusEvent::Query { field, value } => info!(field = %field, value = %value, "query"),
            StatusEvent::Result { field, value } => info!(field = %field, value = %value, "result"),
            StatusEvent::Warning { message } => warn!("{message}"),
            StatusEvent::Error { message } => error!("{message}"),
            StatusEvent::Finished { key } => info!(key = %key, "entry finished"),
        }
    }
}
