//! Exit code logic for the bibdl process.
//!
//! Single responsibility: map the batch summary to the process exit outcome.

use bibdl_core::BatchSummary;

use crate::ProcessExit;

/// Determines the process exit outcome from succeeded/failed counts and interruption.
pub(crate) fn determine_exit_outcome(
    succeeded: usize,
    failed: usize,
    interrupted: bool,
) -> ProcessExit {
    if interrupted {
        ProcessExit::Failure
    } else if failed == 0 {
        ProcessExit::Success
    } else if succeeded > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}

pub(crate) fn exit_for_summary(summary: &BatchSummary) -> ProcessExit {
    determine_exit_outcome(
        summary.downloaded() + summary.resolved(),
        summary.failed(),
        summary.interrupted(),
    )
}
