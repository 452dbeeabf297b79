use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use bibdl_core::{
    BatchOptions, BatchScheduler, BibEntry, Bibliography, CommandHook, HttpFileSink, Reporter,
    ResolutionEngine, ScholarProvider, ThrottleController,
};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ProcessExit;
use crate::app::config::{self, RunSettings};
use crate::app::output::{ConsoleReporter, JsonReporter, write_summary};
use crate::app::{exit_handler, terminal};
use crate::cli::Args;

pub(crate) async fn run_bibdl() -> Result<ProcessExit> {
    let args = Args::parse();

    let no_color = terminal::is_no_color_requested(&args);
    terminal::init_tracing(args.default_log_level(), args.force_cli_log_level(), no_color);

    debug!(?args, "CLI arguments parsed");

    let loaded = config::load_config(args.config.as_deref())?;
    if let Some(path) = loaded.path.as_deref()
        && loaded.config.is_some()
    {
        info!(path = %path.display(), "Loaded config file");
    }
    let settings = config::resolve_settings(&args, loaded.config.as_ref())?;

    let bibliography = load_bibliographies(&settings.paths)?;
    let entries = select_entries(&bibliography, settings.key.as_deref())?;
    check_output_dir(&settings)?;

    let cancel = CancellationToken::new();
    let cancel_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received; finishing current entry");
            cancel_signal.cancel();
        }
    });

    let mut scheduler = build_scheduler(&settings)?.with_cancel_token(cancel);

    let reporter: Box<dyn Reporter> = if settings.json {
        Box::new(JsonReporter::new(io::stdout()))
    } else {
        Box::new(ConsoleReporter::new(io::stdout(), !no_color, args.quiet))
    };

    info!(entries = entries.len(), dry_run = settings.dry_run, "bibdl starting");
    let summary = scheduler.run_all(&entries, reporter.as_ref()).await;

    info!(
        downloaded = summary.downloaded(),
        resolved = summary.resolved(),
        failed = summary.failed(),
        blocks_detected = scheduler.throttle().state().blocks_detected(),
        "Run complete"
    );

    if settings.json || !args.quiet {
        let mut stdout = io::stdout().lock();
        write_summary(&mut stdout, &summary, settings.json)?;
        stdout.flush()?;
    }

    if summary.interrupted() {
        warn!(
            not_processed = summary.not_processed(),
            "Interrupted before all entries were processed"
        );
    }

    Ok(exit_handler::exit_for_summary(&summary))
}

fn load_bibliographies(paths: &[PathBuf]) -> Result<Bibliography> {
    let mut bibliography = Bibliography::new();
    for path in paths {
        let report = bibliography
            .load_file(path)
            .with_context(|| format!("Failed to load bibliography '{}'", path.display()))?;
        if report.parsed == 0 {
            warn!(path = %path.display(), "No bibliography entries found");
        }
        info!(
            path = %path.display(),
            parsed = report.parsed,
            skipped = report.skipped,
            duplicates = report.duplicates.len(),
            "Parsed bibliography"
        );
    }
    Ok(bibliography)
}

fn select_entries(bibliography: &Bibliography, key: Option<&str>) -> Result<Vec<BibEntry>> {
    let Some(key) = key else {
        return Ok(bibliography.entries().to_vec());
    };
    let Some(entry) = bibliography.get(key) else {
        bail!(
            "Unknown bibliography key '{key}'\n  \
             Suggestion: keys are the bracketed labels at the start of each entry, e.g. [SICP]"
        );
    };
    Ok(vec![entry.clone()])
}

fn check_output_dir(settings: &RunSettings) -> Result<()> {
    if settings.dry_run || settings.output_dir.is_dir() {
        return Ok(());
    }
    bail!(
        "Output directory '{}' does not exist\n  \
         Suggestion: create it first or pass an existing directory with --output-dir",
        settings.output_dir.display()
    );
}

fn build_scheduler(
    settings: &RunSettings,
) -> Result<BatchScheduler<ScholarProvider, HttpFileSink>> {
    let (connect, read) = settings.provider_timeouts;
    let provider = ScholarProvider::with_timeouts(&settings.scholar_base_url, connect, read)
        .context("Failed to create search provider")?;

    let (connect, read) = settings.download_timeouts;
    let sink = HttpFileSink::with_timeouts(settings.overwrite, connect, read)
        .context("Failed to create download client")?;

    let mut throttle = ThrottleController::new(settings.throttle.clone());
    if let Some(command) = settings.on_blocked.as_deref() {
        debug!(command, "on-blocked hook configured");
        throttle = throttle.with_hook(CommandHook::new(command));
    }

    let engine = ResolutionEngine::new(provider, settings.filter.clone());
    Ok(BatchScheduler::new(
        engine,
        sink,
        throttle,
        BatchOptions {
            output_dir: settings.output_dir.clone(),
            dry_run: settings.dry_run,
        },
    ))
}
