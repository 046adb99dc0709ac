//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use harvester_core::config::{MAX_ITEM_COUNT, MAX_PACING_MS, MAX_PAGE_READY_TIMEOUT_SECS};

/// Save the platform's current hot-list articles as PDF documents.
///
/// Opens a browser, reuses or refreshes the login session, discovers the top
/// ranked articles and exports each one. Values not given on the command line
/// come from `$XDG_CONFIG_HOME/harvester/config.toml`, then built-in defaults.
#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(author, version)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored log output (also honors NO_COLOR)
    #[arg(long)]
    pub no_color: bool,

    /// Number of hot-list items to export (1-50, default 5)
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u64).range(1..=MAX_ITEM_COUNT as u64))]
    pub count: Option<u64>,

    /// Directory receiving the PDFs (default scys_pdfs)
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Landing page of the platform (default https://scys.com/)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Session file storing login cookies (default scys_cookies.json)
    #[arg(long)]
    pub session_file: Option<PathBuf>,

    /// Delay between items in milliseconds (0-60000, default 2000)
    #[arg(long, value_parser = clap::value_parser!(u64).range(0..=MAX_PACING_MS))]
    pub pacing_ms: Option<u64>,

    /// Maximum wait for a page to load in seconds (1-300, default 10)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_PAGE_READY_TIMEOUT_SECS))]
    pub ready_timeout_secs: Option<u64>,

    /// Run the browser without a window (manual login is not possible)
    #[arg(long)]
    pub headless: bool,

    /// Chrome or Chromium executable to launch
    #[arg(long)]
    pub browser_path: Option<PathBuf>,

    /// Ignore the stored session and log in again
    #[arg(long)]
    pub fresh_login: bool,
}
