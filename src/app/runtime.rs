use std::io::{self, IsTerminal};
use std::sync::atomic::Ordering;

use anyhow::Result;
use clap::Parser;
use harvester_core::Orchestrator;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::app::{config_manager, exit_handler, progress_manager, terminal};
use crate::cli::Args;
use crate::{ProcessExit, output};

pub(crate) async fn run_harvester() -> Result<ProcessExit> {
    // Parse before tracing so --help works without logs.
    let args = Args::parse();

    let no_color = terminal::is_no_color_requested(&args);
    terminal::init_tracing(
        terminal::default_log_level(&args),
        terminal::should_force_cli_level(&args),
        no_color,
    );

    debug!(?args, "CLI arguments parsed");
    let config = config_manager::resolve_config(&args)?;
    info!(
        base_url = %config.base_url,
        count = config.item_count,
        output_dir = %config.output_dir.display(),
        "Harvester starting"
    );

    let cancel = CancellationToken::new();
    let cancel_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current item");
            cancel_signal.cancel();
        }
    });

    let orchestrator = Orchestrator::new(config, cancel)?;

    let use_spinner = terminal::should_use_spinner(
        io::stderr().is_terminal(),
        args.quiet,
        terminal::is_dumb_terminal(),
    );
    let (progress_handle, progress_stop) =
        progress_manager::spawn_progress_ui(use_spinner, orchestrator.progress());

    let result = orchestrator.launch_and_run().await;

    progress_stop.store(true, Ordering::SeqCst);
    if let Some(handle) = progress_handle {
        let _ = handle.await;
    }

    let summary = match result {
        Ok(summary) => summary,
        Err(fatal) => {
            error!(error = %fatal, "Harvest aborted");
            eprintln!("Error: {fatal}");
            return Ok(ProcessExit::Failure);
        }
    };

    if summary.attempted() > 0 || summary.discovered > 0 {
        output::print_run_summary(&summary);
    }

    let exit = exit_handler::summary_exit_outcome(&summary);
    info!(exit_code = exit.code(), "Harvester finished");
    Ok(exit)
}
