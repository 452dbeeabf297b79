//! CLI entry point for bibdl.

use std::process::ExitCode;

mod app;
mod cli;

/// Process outcome, mapped to the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// Every entry succeeded.
    Success,
    /// Some entries succeeded, some failed.
    Partial,
    /// Every entry failed, or the run was interrupted.
    Failure,
}

impl ProcessExit {
    fn code(self) -> ExitCode {
        match self {
            Self::Success => ExitCode::SUCCESS,
            Self::Failure => ExitCode::from(1),
            Self::Partial => ExitCode::from(2),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match app::run_bibdl().await {
        Ok(exit) => exit.code(),
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::from(1)
        }
    }
}
