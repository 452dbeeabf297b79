//! Candidate resolution: from a search phrase to a usable document URL.
//!
//! # Architecture
//!
//! - [`ResolutionEngine`] - primary search, cluster fallback, first usable candidate wins
//! - [`CandidateFilter`] - host blacklist and book-catalog detection
//! - [`ConsistencyTracker`] - flags provider values that disagree with the query
//! - [`ResolutionSession`] - per-entry tracker plus status reporting
//!
//! # Example
//!
//! ```no_run
//! use bibdl_core::report::TracingReporter;
//! use bibdl_core::resolver::{CandidateFilter, ResolutionEngine, ResolutionSession};
//! use bibdl_core::search::ScholarProvider;
//! use bibdl_core::throttle::{ThrottleConfig, ThrottleController};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = ResolutionEngine::new(ScholarProvider::new()?, CandidateFilter::default());
//! let mut throttle = ThrottleController::new(ThrottleConfig::default());
//! let reporter = TracingReporter;
//! let mut session = ResolutionSession::new(&reporter);
//!
//! session.begin("SICP");
//! let resolution = engine
//!     .resolve(
//!         "Structure and Interpretation of Computer Programs",
//!         &mut throttle,
//!         &mut session,
//!     )
//!     .await?;
//! println!("Resolved URL: {}", resolution.url);
//! # Ok(())
//! # }
//! ```

mod consistency;
mod engine;
mod error;
mod filter;
mod session;
mod utils;

pub use consistency::{ConsistencyTracker, ConsistencyWarning, MismatchKind, similar};
pub use engine::{BOOK_ADVISORY, CandidateSource, Resolution, ResolutionEngine};
pub use error::{ResolveError, ResolveErrorKind};
pub use filter::{
    CandidateFilter, Classification, DEFAULT_BLACKLIST, DEFAULT_BOOK_HOSTS, FilterError,
};
pub use session::{
    FIELD_AUTHORS, FIELD_CLUSTER, FIELD_COPIED_TO, FIELD_PDF, FIELD_TITLE, FIELD_URL, FIELD_YEAR,
    ResolutionSession,
};
pub use utils::{canonical_host, extract_host, unwrap_proxied_url};
