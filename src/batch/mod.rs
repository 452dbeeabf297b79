//! Sequential processing of bibliography entries.
//!
//! [`BatchScheduler::run_all`] walks entries in collection order. For each
//! entry it checks the destination, resolves the title, writes the document
//! and then sleeps for a delay sampled from the throttle. No delay follows the
//! last entry or an entry for which the provider was never contacted.
//!
//! A shared cancellation token is checked before every entry and raced
//! against the inter-entry delay, so an interrupt lets the current entry
//! finish, cuts the pending wait short and leaves the rest untouched.

use std::path::PathBuf;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::download::{DownloadError, FileSink, destination_path};
use crate::parser::{BibEntry, MAIN_AUTHOR_LIMIT};
use crate::report::Reporter;
use crate::resolver::{
    FIELD_AUTHORS, FIELD_COPIED_TO, FIELD_TITLE, FIELD_YEAR, ResolutionEngine, ResolutionSession,
    ResolveError, ResolveErrorKind,
};
use crate::search::SearchProvider;
use crate::throttle::ThrottleController;

/// Run options.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Directory documents are written to.
    pub output_dir: PathBuf,
    /// Resolve only; never write.
    pub dry_run: bool,
}

/// Why an entry failed.
#[derive(Debug, Error)]
pub enum EntryError {
    /// Resolution failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// Destination check or transfer failed.
    #[error(transparent)]
    Download(#[from] DownloadError),
}

/// Failure categories reported in the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The primary search was empty.
    NoResults,
    /// No candidate had a usable URL.
    NoPdfFound,
    /// The provider call failed.
    ProviderError,
    /// The destination was missing, not writable, or already present.
    LocalIoError,
    /// The document transfer failed.
    TransferError,
}

impl EntryError {
    /// Returns the failure category.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Resolve(error) => match error.kind() {
                ResolveErrorKind::NoResults => FailureKind::NoResults,
                ResolveErrorKind::NoPdfFound => FailureKind::NoPdfFound,
                ResolveErrorKind::Provider => FailureKind::ProviderError,
            },
            Self::Download(error) if error.is_local() => FailureKind::LocalIoError,
            Self::Download(_) => FailureKind::TransferError,
        }
    }
}

/// Result of processing one entry.
#[derive(Debug)]
pub enum EntryOutcome {
    /// The document was written.
    Downloaded {
        /// Bibliography key.
        key: String,
        /// Source URL.
        url: String,
        /// Written file.
        path: PathBuf,
        /// Bytes written.
        bytes: u64,
        /// The result looked like a book.
        book_hint: bool,
    },
    /// Resolved in dry-run mode; nothing was written.
    Resolved {
        /// Bibliography key.
        key: String,
        /// Resolved URL.
        url: String,
        /// Where the document would be written.
        path: PathBuf,
        /// The result looked like a book.
        book_hint: bool,
    },
    /// The entry failed.
    Failed {
        /// Bibliography key.
        key: String,
        /// What went wrong.
        error: EntryError,
        /// Whether any provider call was made for this entry.
        provider_contacted: bool,
    },
}

impl EntryOutcome {
    /// Bibliography key of the entry.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Downloaded { key, .. } | Self::Resolved { key, .. } | Self::Failed { key, .. } => {
                key
            }
        }
    }

    /// Whether the provider was contacted while processing the entry.
    #[must_use]
    pub fn provider_contacted(&self) -> bool {
        match self {
            Self::Downloaded { .. } | Self::Resolved { .. } => true,
            Self::Failed {
                provider_contacted, ..
            } => *provider_contacted,
        }
    }

    /// Failure category, for failed entries.
    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Failed { error, .. } => Some(error.kind()),
            _ => None,
        }
    }
}

/// Per-run totals.
#[derive(Debug, Default)]
pub struct BatchSummary {
    outcomes: Vec<EntryOutcome>,
    interrupted: bool,
    not_processed: usize,
}

impl BatchSummary {
    /// Outcomes in processing order.
    #[must_use]
    pub fn outcomes(&self) -> &[EntryOutcome] {
        &self.outcomes
    }

    /// Entries written.
    #[must_use]
    pub fn downloaded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, EntryOutcome::Downloaded { .. }))
            .count()
    }

    /// Entries resolved in dry-run mode.
    #[must_use]
    pub fn resolved(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, EntryOutcome::Resolved { .. }))
            .count()
    }

    /// Entries that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, EntryOutcome::Failed { .. }))
            .count()
    }

    /// Failed entries of one kind.
    #[must_use]
    pub fn failed_with(&self, kind: FailureKind) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.failure_kind() == Some(kind))
            .count()
    }

    /// Whether the run stopped early on cancellation.
    #[must_use]
    pub fn interrupted(&self) -> bool {
        self.interrupted
    }

    /// Entries left untouched after cancellation.
    #[must_use]
    pub fn not_processed(&self) -> usize {
        self.not_processed
    }

    /// True when every entry succeeded and the run was not interrupted.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0 && !self.interrupted
    }
}

/// Drives resolution and download over many entries.
pub struct BatchScheduler<P, S> {
    engine: ResolutionEngine<P>,
    sink: S,
    throttle: ThrottleController,
    options: BatchOptions,
    cancel: CancellationToken,
}

impl<P: SearchProvider, S: FileSink> BatchScheduler<P, S> {
    /// Creates a scheduler with a fresh cancellation token.
    #[must_use]
    pub fn new(
        engine: ResolutionEngine<P>,
        sink: S,
        throttle: ThrottleController,
        options: BatchOptions,
    ) -> Self {
        Self {
            engine,
            sink,
            throttle,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses an externally owned cancellation token (cancelled by a Ctrl-C handler).
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// A handle to the token checked between entries.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The throttle, for inspecting its state after a run.
    #[must_use]
    pub fn throttle(&self) -> &ThrottleController {
        &self.throttle
    }

    /// The sink documents are written to.
    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The resolution engine.
    #[must_use]
    pub fn engine(&self) -> &ResolutionEngine<P> {
        &self.engine
    }

    /// Processes `entries` in order, reporting status events to `reporter`.
    #[instrument(skip_all, fields(entries = entries.len(), dry_run = self.options.dry_run))]
    pub async fn run_all(&mut self, entries: &[BibEntry], reporter: &dyn Reporter) -> BatchSummary {
        let mut session = ResolutionSession::new(reporter);
        let mut summary = BatchSummary::default();

        for (index, entry) in entries.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!(remaining = entries.len() - index, "interrupted; stopping before next entry");
                summary.interrupted = true;
                summary.not_processed = entries.len() - index;
                break;
            }

            let outcome = self.run_one(entry, &mut session).await;
            let contacted = outcome.provider_contacted();
            summary.outcomes.push(outcome);

            let is_last = index + 1 == entries.len();
            if !is_last && contacted && !self.cancel.is_cancelled() {
                let delay = self.throttle.next_delay();
                debug!(delay_ms = delay.as_millis(), "waiting before next entry");
                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    () = self.cancel.cancelled() => {
                        debug!("delay cut short by cancellation");
                    }
                }
            }
        }

        info!(
            downloaded = summary.downloaded(),
            resolved = summary.resolved(),
            failed = summary.failed(),
            interrupted = summary.interrupted,
            "batch finished"
        );
        summary
    }

    /// Processes one entry: check destination, resolve, write.
    async fn run_one(&mut self, entry: &BibEntry, session: &mut ResolutionSession<'_>) -> EntryOutcome {
        let key = entry.key().to_string();
        session.begin(&key);
        session.query(FIELD_TITLE, Some(entry.title()));
        session.query(FIELD_AUTHORS, entry.main_authors(MAIN_AUTHOR_LIMIT).as_deref());
        session.query(FIELD_YEAR, entry.year());

        let destination = destination_path(&self.options.output_dir, &key);
        if !self.options.dry_run
            && let Err(error) = self.sink.check_destination(&destination)
        {
            debug!(key = %key, error = %error, "skipping entry before contacting provider");
            return fail(session, key, error.into(), false);
        }

        let calls_before = self.throttle.state().calls_issued();
        let resolved = self
            .engine
            .resolve(entry.title(), &mut self.throttle, session)
            .await;
        let contacted = self.throttle.state().calls_issued() > calls_before;

        let resolution = match resolved {
            Ok(resolution) => resolution,
            Err(error) => return fail(session, key, error.into(), contacted),
        };

        if self.options.dry_run {
            session.finish();
            return EntryOutcome::Resolved {
                key,
                url: resolution.url,
                path: destination,
                book_hint: resolution.book_hint,
            };
        }

        match self.sink.write(&resolution.url, &destination).await {
            Ok(bytes) => {
                session.info(FIELD_COPIED_TO, Some(&destination.display().to_string()));
                session.finish();
                EntryOutcome::Downloaded {
                    key,
                    url: resolution.url,
                    path: destination,
                    bytes,
                    book_hint: resolution.book_hint,
                }
            }
            Err(error) => fail(session, key, error.into(), contacted),
        }
    }
}

fn fail(
    session: &mut ResolutionSession<'_>,
    key: String,
    error: EntryError,
    provider_contacted: bool,
) -> EntryOutcome {
    session.error(&error.to_string());
    session.finish();
    EntryOutcome::Failed {
        key,
        error,
        provider_contacted,
    }
}

impl<P: SearchProvider, S> std::fmt::Debug for BatchScheduler<P, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScheduler")
            .field("engine", &self.engine)
            .field("throttle", &self.throttle)
            .field("options", &self.options)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tokio::time::Instant;

    use super::*;
    use crate::report::StatusEvent;
    use crate::resolver::CandidateFilter;
    use crate::search::ResultRecord;
    use crate::test_support::{MemorySink, ProviderCall, RecordingReporter, ScriptedProvider};
    use crate::throttle::{DEFAULT_MIN_DELAY, ThrottleConfig};

    fn entry(key: &str, title: &str) -> BibEntry {
        BibEntry::new(key, "Ann Author", title, "Some Press, 2001.")
    }

    fn hit(title: &str) -> ResultRecord {
        ResultRecord::new(title)
            .with_year("2001")
            .with_url(format!("https://example.org/{title}"))
            .with_pdf_url(format!("https://example.org/{title}.pdf"))
    }

    fn scheduler(
        provider: ScriptedProvider,
        output_dir: PathBuf,
        dry_run: bool,
    ) -> BatchScheduler<ScriptedProvider, MemorySink> {
        BatchScheduler::new(
            ResolutionEngine::new(provider, CandidateFilter::default()),
            MemorySink::default(),
            ThrottleController::with_rng(ThrottleConfig::default(), StdRng::seed_from_u64(3)),
            BatchOptions {
                output_dir,
                dry_run,
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_all_keeps_min_gap_between_provider_calls() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ScriptedProvider::new()
            .with_search(Ok(vec![hit("alpha")]))
            .with_search(Ok(vec![
                ResultRecord::new("beta")
                    .with_url("https://example.org/beta")
                    .with_pdf_url("https://link.springer.com/beta.pdf")
                    .with_cluster_id("9"),
            ]))
            .with_cluster(Ok(vec![hit("beta")]))
            .with_search(Ok(vec![hit("gamma")]));
        let mut batch = scheduler(provider, dir.path().to_path_buf(), false);
        let reporter = RecordingReporter::default();
        let entries = [entry("A", "alpha"), entry("B", "beta"), entry("C", "gamma")];

        let summary = batch.run_all(&entries, &reporter).await;

        assert_eq!(summary.downloaded(), 3);
        assert!(summary.is_success());
        let calls = batch.engine().provider().calls();
        assert_eq!(calls.len(), 4);
        for pair in calls.windows(2) {
            assert!(pair[1].at() - pair[0].at() >= DEFAULT_MIN_DELAY);
        }
        assert!(matches!(&calls[0], ProviderCall::Search { phrase, .. } if phrase == "alpha"));
        let writes = batch.sink().writes();
        assert_eq!(writes[1].0, "https://example.org/beta.pdf");
        assert_eq!(writes[2].1, dir.path().join("C.pdf"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_all_no_delay_after_last_entry() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ScriptedProvider::new().with_search(Ok(vec![hit("alpha")]));
        let mut batch = scheduler(provider, dir.path().to_path_buf(), false);
        let reporter = RecordingReporter::default();

        let started = Instant::now();
        let summary = batch.run_all(&[entry("A", "alpha")], &reporter).await;

        assert_eq!(summary.downloaded(), 1);
        assert_eq!(started.elapsed(), std::time::Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_all_skips_without_delay_on_local_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("A.pdf"), b"%PDF").unwrap();
        let provider = ScriptedProvider::new().with_search(Ok(vec![hit("beta")]));
        let mut batch = scheduler(provider, dir.path().to_path_buf(), false);
        let reporter = RecordingReporter::default();

        let started = Instant::now();
        let summary = batch
            .run_all(&[entry("A", "alpha"), entry("B", "beta")], &reporter)
            .await;

        assert_eq!(started.elapsed(), std::time::Duration::ZERO);
        assert_eq!(summary.failed_with(FailureKind::LocalIoError), 1);
        assert_eq!(summary.downloaded(), 1);
        assert!(!summary.outcomes()[0].provider_contacted());
        assert_eq!(batch.engine().provider().calls().len(), 1);
        assert!(!summary.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_all_missing_output_dir_never_contacts_provider() {
        let dir = tempfile::tempdir().unwrap();
        let mut batch = scheduler(ScriptedProvider::new(), dir.path().join("missing"), false);
        let reporter = RecordingReporter::default();

        let summary = batch
            .run_all(&[entry("A", "alpha"), entry("B", "beta")], &reporter)
            .await;

        assert_eq!(summary.failed_with(FailureKind::LocalIoError), 2);
        assert!(batch.engine().provider().calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_all_records_failure_kinds_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ScriptedProvider::new()
            .with_search(Ok(Vec::new()))
            .with_search(Ok(vec![ResultRecord::new("beta").with_url("https://example.org/b")]))
            .with_search(Ok(vec![hit("gamma")]));
        let mut batch = scheduler(provider, dir.path().to_path_buf(), false);
        let reporter = RecordingReporter::default();
        let entries = [entry("A", "alpha"), entry("B", "beta"), entry("C", "gamma")];

        let summary = batch.run_all(&entries, &reporter).await;

        assert_eq!(summary.failed_with(FailureKind::NoResults), 1);
        assert_eq!(summary.failed_with(FailureKind::NoPdfFound), 1);
        assert_eq!(summary.downloaded(), 1);
        assert_eq!(batch.throttle().state().blocks_detected(), 1);
        let errors = reporter
            .events()
            .into_iter()
            .filter(|event| matches!(event, StatusEvent::Error { .. }))
            .count();
        assert_eq!(errors, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_all_dry_run_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ScriptedProvider::new().with_search(Ok(vec![hit("alpha")]));
        let mut batch = scheduler(provider, dir.path().join("absent"), true);
        let reporter = RecordingReporter::default();

        let summary = batch.run_all(&[entry("A", "alpha")], &reporter).await;

        assert_eq!(summary.resolved(), 1);
        assert!(batch.sink().writes().is_empty());
        assert!(summary.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_all_stops_when_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ScriptedProvider::new()
            .with_search(Ok(vec![hit("alpha")]))
            .with_search(Ok(vec![hit("beta")]));
        let mut batch = scheduler(provider, dir.path().to_path_buf(), false);
        let cancel = batch.cancel_token();
        let reporter = move |event: &StatusEvent| {
            if matches!(event, StatusEvent::Finished { .. }) {
                cancel.cancel();
            }
        };
        let entries = [entry("A", "alpha"), entry("B", "beta"), entry("C", "gamma")];

        let summary = batch.run_all(&entries, &reporter).await;

        assert!(summary.interrupted());
        assert_eq!(summary.downloaded(), 1);
        assert_eq!(summary.not_processed(), 2);
        assert!(!summary.is_success());
        assert_eq!(batch.engine().provider().calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_all_skips_delay_once_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ScriptedProvider::new()
            .with_search(Ok(vec![hit("alpha")]))
            .with_search(Ok(vec![hit("beta")]));
        let mut batch = scheduler(provider, dir.path().to_path_buf(), false);
        let cancel = batch.cancel_token();
        let cancelled_at = std::sync::Mutex::new(None);
        let reporter = |event: &StatusEvent| {
            if matches!(event, StatusEvent::Finished { .. }) {
                cancel.cancel();
                *cancelled_at.lock().unwrap() = Some(Instant::now());
            }
        };
        let entries = [entry("A", "alpha"), entry("B", "beta")];

        let summary = batch.run_all(&entries, &reporter).await;

        let cancelled_at = cancelled_at.lock().unwrap().unwrap();
        assert_eq!(Instant::now() - cancelled_at, std::time::Duration::ZERO);
        assert!(summary.interrupted());
        assert_eq!(summary.not_processed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_all_cancel_cuts_pending_delay_short() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ScriptedProvider::new()
            .with_search(Ok(vec![hit("alpha")]))
            .with_search(Ok(vec![hit("beta")]));
        let mut batch = scheduler(provider, dir.path().to_path_buf(), false);
        let reporter = RecordingReporter::default();
        let entries = [entry("A", "alpha"), entry("B", "beta"), entry("C", "gamma")];

        let start = Instant::now();
        let cancel = batch.cancel_token();
        let interrupt = std::time::Duration::from_millis(100);
        tokio::spawn(async move {
            tokio::time::sleep(interrupt).await;
            cancel.cancel();
        });

        let summary = batch.run_all(&entries, &reporter).await;

        let elapsed = Instant::now() - start;
        assert_eq!(elapsed, interrupt);
        assert!(elapsed < DEFAULT_MIN_DELAY);
        assert!(summary.interrupted());
        assert_eq!(summary.downloaded(), 1);
        assert_eq!(summary.not_processed(), 2);
        assert_eq!(batch.engine().provider().calls().len(), 1);
    }
}
