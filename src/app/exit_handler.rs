//! Exit code logic for the harvester process.
//!
//! Single responsibility: map a run summary to the process exit outcome.

use harvester_core::RunSummary;

use crate::ProcessExit;

/// Determines the process exit outcome from exported and unsuccessful item counts.
pub(crate) fn determine_exit_outcome(succeeded: usize, unsuccessful: usize) -> ProcessExit {
    if unsuccessful == 0 {
        ProcessExit::Success
    } else if succeeded > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}

/// Skipped and failed items both count against the run; an interrupt is partial.
pub(crate) fn summary_exit_outcome(summary: &RunSummary) -> ProcessExit {
    if summary.interrupted {
        return ProcessExit::Partial;
    }
    let succeeded = summary.succeeded();
    determine_exit_outcome(succeeded, summary.attempted() - succeeded)
}
