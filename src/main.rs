//! CLI entry point for the harvester tool.

mod app;
mod app_config;
mod cli;
mod output;

/// Process outcome reported through the exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// Every attempted item was exported.
    Success,
    /// Some items exported, or the run was interrupted.
    Partial,
    /// Nothing exported, or the run could not start.
    Failure,
}

impl ProcessExit {
    pub(crate) fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Partial => 1,
            Self::Failure => 2,
        }
    }
}

#[tokio::main]
async fn main() {
    let exit = match app::runtime::run_harvester().await {
        Ok(exit) => exit,
        Err(error) => {
            eprintln!("Error: {error:#}");
            ProcessExit::Failure
        }
    };
    // A login prompt interrupted by Ctrl-C leaves a blocking stdin read
    // behind; exiting here skips waiting for it on runtime shutdown.
    std::process::exit(i32::from(exit.code()));
}
