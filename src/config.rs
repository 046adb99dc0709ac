//! Static run configuration for the harvest pipeline.
//!
//! Everything here is fixed for the lifetime of a run; nothing is negotiated
//! with the target platform at runtime.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::driver::LaunchOptions;

/// Landing page of the target platform.
pub const DEFAULT_BASE_URL: &str = "https://scys.com/";

/// Number of ranked items harvested per run.
pub const DEFAULT_ITEM_COUNT: usize = 5;

/// Upper bound accepted for the item count.
pub const MAX_ITEM_COUNT: usize = 50;

/// Delay observed between two exported items.
pub const DEFAULT_PACING: Duration = Duration::from_millis(2000);

/// Upper bound for the pacing delay in milliseconds.
pub const MAX_PACING_MS: u64 = 60_000;

/// Bounded wait for a page to become ready after navigation.
pub const DEFAULT_PAGE_READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound for the page-ready timeout in seconds.
pub const MAX_PAGE_READY_TIMEOUT_SECS: u64 = 300;

/// Session file written after a successful login.
pub const DEFAULT_SESSION_FILE: &str = "scys_cookies.json";

/// Directory receiving the exported documents.
pub const DEFAULT_OUTPUT_DIR: &str = "scys_pdfs";

/// Fixed-name markup dump written when discovery under-delivers.
pub const DEFAULT_DIAGNOSTIC_FILE: &str = "debug_page.html";

/// CJK-capable fonts tried in order by the native exporter.
pub const DEFAULT_FONT_CANDIDATES: [&str; 4] = [
    "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
    "/usr/share/fonts/truetype/wqy/wqy-zenhei.ttc",
    "/usr/share/fonts/truetype/arphic/uming.ttc",
    "/System/Library/Fonts/PingFang.ttc",
];

/// Invalid configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Base URL is not an absolute http(s) URL.
    #[error("invalid base URL '{url}': expected an absolute http(s) URL")]
    InvalidBaseUrl {
        /// The rejected value.
        url: String,
    },
    /// Item count outside `1..=MAX_ITEM_COUNT`.
    #[error("invalid item count {value}: must be between 1 and {MAX_ITEM_COUNT}")]
    InvalidItemCount {
        /// The rejected value.
        value: usize,
    },
    /// Pacing delay above the maximum.
    #[error("invalid pacing {millis}ms: must be at most {MAX_PACING_MS}")]
    InvalidPacing {
        /// The rejected value in milliseconds.
        millis: u128,
    },
    /// Page-ready timeout of zero or above the maximum.
    #[error(
        "invalid page-ready timeout {secs}s: must be between 1 and {MAX_PAGE_READY_TIMEOUT_SECS}"
    )]
    InvalidReadyTimeout {
        /// The rejected value in seconds.
        secs: u64,
    },
}

/// Resolved configuration for one harvest run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestConfig {
    /// Landing page URL; also the base for relative links.
    pub base_url: String,
    /// Target number of items (`N`).
    pub item_count: usize,
    /// Delay between items.
    pub pacing: Duration,
    /// Bounded wait after each navigation.
    pub page_ready_timeout: Duration,
    /// Destination directory for documents.
    pub output_dir: PathBuf,
    /// Session storage file.
    pub session_file: PathBuf,
    /// Diagnostic snapshot path.
    pub diagnostic_file: PathBuf,
    /// Fonts tried by the native exporter, in priority order.
    pub font_candidates: Vec<PathBuf>,
    /// Ignore any stored session and log in interactively.
    pub fresh_login: bool,
    /// Browser launch settings.
    pub launch: LaunchOptions,
}

impl HarvestConfig {
    /// Checks value ranges and the base URL.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scheme_ok = Url::parse(&self.base_url)
            .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
            .unwrap_or(false);
        if !scheme_ok {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
            });
        }
        if !(1..=MAX_ITEM_COUNT).contains(&self.item_count) {
            return Err(ConfigError::InvalidItemCount {
                value: self.item_count,
            });
        }
        let millis = self.pacing.as_millis();
        if millis > u128::from(MAX_PACING_MS) {
            return Err(ConfigError::InvalidPacing { millis });
        }
        let secs = self.page_ready_timeout.as_secs();
        if !(1..=MAX_PAGE_READY_TIMEOUT_SECS).contains(&secs) {
            return Err(ConfigError::InvalidReadyTimeout { secs });
        }
        Ok(())
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            item_count: DEFAULT_ITEM_COUNT,
            pacing: DEFAULT_PACING,
            page_ready_timeout: DEFAULT_PAGE_READY_TIMEOUT,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            diagnostic_file: PathBuf::from(DEFAULT_DIAGNOSTIC_FILE),
            font_candidates: DEFAULT_FONT_CANDIDATES.iter().map(PathBuf::from).collect(),
            fresh_login: false,
            launch: LaunchOptions::default(),
        }
    }
}
