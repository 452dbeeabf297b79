//! Bibliography Downloader Core Library
//!
//! This library resolves bibliography entries to downloadable documents by
//! querying a scholarly search provider, filtering candidate results, and
//! backing off adaptively when the provider starts refusing service.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`parser`] - Line-oriented bibliography parsing
//! - [`search`] - Search provider capability and the Google Scholar scraper
//! - [`resolver`] - Candidate filtering, consistency checks, and the resolution engine
//! - [`throttle`] - Adaptive delay, identity rotation, and block detection
//! - [`download`] - Destination checks and streaming document downloads
//! - [`batch`] - Sequential scheduling across many entries
//! - [`report`] - Status events and the reporter sink

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
pub mod download;
pub mod parser;
pub mod report;
pub mod resolver;
pub mod search;
pub mod throttle;
pub(crate) mod user_agent;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use batch::{BatchOptions, BatchScheduler, BatchSummary, EntryError, EntryOutcome, FailureKind};
pub use download::{DownloadError, FileSink, HttpFileSink, destination_path};
pub use parser::{BibEntry, Bibliography, BibliographyError, ParseReport};
pub use report::{Reporter, StatusEvent, TracingReporter};
pub use resolver::{
    CandidateFilter, Classification, ConsistencyTracker, Resolution, ResolutionEngine,
    ResolutionSession, ResolveError,
};
pub use search::{Identity, ResultRecord, ScholarProvider, SearchError, SearchProvider};
pub use throttle::{BlockEvent, BlockedHook, CommandHook, ThrottleConfig, ThrottleController};
