//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Resolve bibliography entries to PDFs and download them.
///
/// Each entry is looked up on Google Scholar by its title; the first result
/// with a usable document link (or, failing that, the first usable candidate
/// among the other versions of the work) is downloaded to `<KEY>.pdf`.
#[derive(Parser, Debug)]
#[command(name = "bibdl")]
#[command(author, version, about)]
pub struct Args {
    /// Bibliography files, one `[KEY] Authors. Title. Publication.` entry per line
    #[arg(required = true, value_name = "BIBLIOGRAPHY")]
    pub paths: Vec<PathBuf>,

    /// Fetch only the entry with this key
    #[arg(short = 'k', long)]
    pub key: Option<String>,

    /// Directory documents are written to [default: current directory]
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Overwrite existing files
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Resolve URLs without downloading anything
    #[arg(long)]
    pub dry_run: bool,

    /// Emit status events as JSON lines on stdout
    #[arg(long)]
    pub json: bool,

    /// Shell command run whenever the provider appears to block requests
    #[arg(long, value_name = "CMD")]
    pub on_blocked: Option<String>,

    /// Mean delay between provider requests in milliseconds
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..=600_000))]
    pub delay_ms: Option<u64>,

    /// Lower bound for any delay between provider requests in milliseconds
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..=600_000))]
    pub min_delay_ms: Option<u64>,

    /// Config file [default: $XDG_CONFIG_HOME/bibdl/config.toml]
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl Args {
    /// Default log level derived from `-v`/`-q`.
    #[must_use]
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }

    /// Whether `-v`/`-q` should win over `RUST_LOG`.
    #[must_use]
    pub fn force_cli_log_level(&self) -> bool {
        self.quiet || self.verbose > 0
    }
}
