//! Rendering of status events and the run summary.

use std::io::Write;
use std::sync::Mutex;

use bibdl_core::{BatchSummary, FailureKind, Reporter, StatusEvent};
use serde_json::json;

const LABEL_WIDTH: usize = 12;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";
const RED: &str = "\x1b[91m";
const YELLOW: &str = "\x1b[93m";
const BLUE: &str = "\x1b[94m";

/// Aligned, optionally colored text lines.
///
/// Quiet mode drops everything except warnings and errors.
pub(crate) struct ConsoleReporter<W> {
    out: Mutex<W>,
    color: bool,
    quiet: bool,
}

impl<W: Write + Send> ConsoleReporter<W> {
    pub(crate) fn new(out: W, color: bool, quiet: bool) -> Self {
        Self {
            out: Mutex::new(out),
            color,
            quiet,
        }
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn paint(&self, code: &'static str) -> &'static str {
        if self.color { code } else { "" }
    }

    fn render(&self, event: &StatusEvent) -> Option<String> {
        let reset = self.paint(RESET);
        match event {
            StatusEvent::Title { key } if !self.quiet => Some(format!(
                "\n{}Processing {}{key}{reset}",
                self.paint(BOLD),
                self.paint(YELLOW)
            )),
            StatusEvent::Query { field, value } | StatusEvent::Result { field, value }
                if !self.quiet =>
            {
                Some(format!(
                    "{}  {field:<LABEL_WIDTH$}{reset}: {value}",
                    self.paint(BLUE)
                ))
            }
            StatusEvent::Warning { message } => Some(format!(
                "{}  {:<LABEL_WIDTH$}: {message}{reset}",
                self.paint(RED),
                "WARNING"
            )),
            StatusEvent::Error { message } => Some(format!(
                "{}  {:<LABEL_WIDTH$}: {message}{reset}",
                self.paint(RED),
                "ERROR"
            )),
            _ => None,
        }
    }
}

impl<W: Write + Send> Reporter for ConsoleReporter<W> {
    fn report(&self, event: &StatusEvent) {
        let Some(line) = self.render(event) else {
            return;
        };
        let mut out = self
            .out
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let _ = writeln!(out, "{line}");
    }
}

/// One JSON object per event.
pub(crate) struct JsonReporter<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonReporter<W> {
    pub(crate) fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl<W: Write + Send> Reporter for JsonReporter<W> {
    fn report(&self, event: &StatusEvent) {
        let Ok(line) = serde_json::to_string(event) else {
            return;
        };
        let mut out = self
            .out
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let _ = writeln!(out, "{line}");
    }
}

fn failure_label(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::NoResults => "no_results",
        FailureKind::NoPdfFound => "no_pdf_found",
        FailureKind::ProviderError => "provider_error",
        FailureKind::LocalIoError => "local_io_error",
        FailureKind::TransferError => "transfer_error",
    }
}

const FAILURE_KINDS: [FailureKind; 5] = [
    FailureKind::NoResults,
    FailureKind::NoPdfFound,
    FailureKind::ProviderError,
    FailureKind::LocalIoError,
    FailureKind::TransferError,
];

/// Writes the end-of-run summary, as text or as a single JSON object.
pub(crate) fn write_summary(
    out: &mut impl Write,
    summary: &BatchSummary,
    json: bool,
) -> std::io::Result<()> {
    if json {
        let failures: serde_json::Map<String, serde_json::Value> = FAILURE_KINDS
            .iter()
            .map(|&kind| (failure_label(kind).to_string(), summary.failed_with(kind).into()))
            .collect();
        let value = json!({
            "event": "summary",
            "entries": summary.outcomes().len(),
            "downloaded": summary.downloaded(),
            "resolved": summary.resolved(),
            "failed": summary.failed(),
            "failures": failures,
            "interrupted": summary.interrupted(),
            "not_processed": summary.not_processed(),
        });
        return writeln!(out, "{value}");
    }

    writeln!(out)?;
    writeln!(
        out,
        "Summary: {} entries, {} downloaded, {} resolved, {} failed",
        summary.outcomes().len(),
        summary.downloaded(),
        summary.resolved(),
        summary.failed()
    )?;
    for kind in FAILURE_KINDS {
        let count = summary.failed_with(kind);
        if count > 0 {
            writeln!(out, "  {:<LABEL_WIDTH$}: {count}", failure_label(kind))?;
        }
    }
    if summary.interrupted() {
        writeln!(
            out,
            "Interrupted: {} entries not processed",
            summary.not_processed()
        )?;
    }
    Ok(())
}
