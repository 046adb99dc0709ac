//! Progress UI (spinner) for harvest runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use harvester_core::RunProgress;
use indicatif::{ProgressBar, ProgressStyle};

/// Spawns the progress UI (spinner) when requested.
/// Returns (handle, stop) so the caller can signal stop and await the handle.
/// When `use_spinner` is false, returns (None, stop) with stop already true.
pub(crate) fn spawn_progress_ui(
    use_spinner: bool,
    progress: Arc<RunProgress>,
) -> (Option<tokio::task::JoinHandle<()>>, Arc<AtomicBool>) {
    if !use_spinner {
        return (None, Arc::new(AtomicBool::new(true)));
    }
    let stop = Arc::new(AtomicBool::new(false));
    let handle = spawn_spinner_inner(progress, Arc::clone(&stop));
    (Some(handle), stop)
}

/// Spinner text for the current counters.
pub(crate) fn progress_message(progress: &RunProgress) -> String {
    let total = progress.total();
    format!(
        "[{}/{}] Exporting... ({} saved, {} skipped, {} failed)",
        progress.current().min(total),
        total,
        progress.exported(),
        progress.skipped(),
        progress.failed()
    )
}

fn spawn_spinner_inner(
    progress: Arc<RunProgress>,
    stop: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        // Stays hidden until discovery finishes so the login prompt is not overdrawn.
        let mut spinner: Option<ProgressBar> = None;

        while !stop.load(Ordering::SeqCst) {
            if progress.total() > 0 {
                let bar = spinner.get_or_insert_with(new_spinner);
                bar.set_message(progress_message(&progress));
            }
            tokio::time::sleep(Duration::from_millis(120)).await;
        }

        if let Some(bar) = spinner {
            bar.finish_and_clear();
        }
    })
}

fn new_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
