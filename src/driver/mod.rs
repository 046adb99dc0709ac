//! Browser-automation capability consumed by the pipeline.
//!
//! The pipeline never talks to a browser directly. Every component receives a
//! `&mut dyn BrowserDriver` for the duration of one call, which keeps exactly
//! one navigation in flight and prevents components from holding on to the
//! handle afterwards.
//!
//! - [`BrowserDriver`] - navigation, DOM queries, script execution, cookies, printing
//! - [`PageElement`] - a handle to one element returned by [`BrowserDriver::query`]
//! - [`ChromiumDriver`] - Chrome DevTools Protocol implementation

mod chromium;
#[cfg(test)]
pub(crate) mod fake;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::session::Credential;

pub use chromium::{ChromiumDriver, DEFAULT_USER_AGENT, LaunchOptions};

/// Script evaluated while waiting for a page to become usable.
const READY_PROBE_SCRIPT: &str = "document.readyState !== 'loading' && document.body !== null";

/// Interval between two readiness probes.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Errors raised by a driver implementation.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// The browser could not be started.
    #[error("browser launch failed: {0}")]
    Launch(String),

    /// Navigation did not complete.
    #[error("navigation to {url} failed: {reason}")]
    Navigation {
        /// Target URL.
        url: String,
        /// Driver-reported cause.
        reason: String,
    },

    /// A selector query failed (unsupported selector, detached page).
    #[error("query {selector} failed: {reason}")]
    Query {
        /// The selector that was evaluated.
        selector: String,
        /// Driver-reported cause.
        reason: String,
    },

    /// Script evaluation failed.
    #[error("script execution failed: {0}")]
    Script(String),

    /// Reading or writing cookies failed.
    #[error("cookie operation failed: {0}")]
    Cookies(String),

    /// The print-to-document primitive failed.
    #[error("print to document failed: {0}")]
    Print(String),

    /// Any other protocol-level failure.
    #[error("browser protocol error: {0}")]
    Protocol(String),
}

/// A DOM selector expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// CSS selector.
    Css(String),
    /// XPath expression.
    XPath(String),
}

impl Selector {
    /// Creates a CSS selector.
    #[must_use]
    pub fn css(expression: impl Into<String>) -> Self {
        Self::Css(expression.into())
    }

    /// Creates an XPath selector.
    #[must_use]
    pub fn xpath(expression: impl Into<String>) -> Self {
        Self::XPath(expression.into())
    }

    /// Returns the raw expression.
    #[must_use]
    pub fn expression(&self) -> &str {
        match self {
            Self::Css(expr) | Self::XPath(expr) => expr,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(expr) => write!(f, "css:{expr}"),
            Self::XPath(expr) => write!(f, "xpath:{expr}"),
        }
    }
}

/// Settings for the print-to-document primitive. Lengths are in inches.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintOptions {
    pub landscape: bool,
    pub display_header_footer: bool,
    pub print_background: bool,
    pub prefer_css_page_size: bool,
    pub paper_width: f64,
    pub paper_height: f64,
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub margin_right: f64,
}

impl PrintOptions {
    /// Portrait A4 with backgrounds, CSS page size preferred and equal margins.
    #[must_use]
    pub fn portrait_a4(margin: f64) -> Self {
        Self {
            landscape: false,
            display_header_footer: false,
            print_background: true,
            prefer_css_page_size: true,
            paper_width: 8.27,
            paper_height: 11.69,
            margin_top: margin,
            margin_bottom: margin,
            margin_left: margin,
            margin_right: margin,
        }
    }
}

/// A handle to one element of the current page.
#[async_trait]
pub trait PageElement: Send + Sync {
    /// Rendered text of the element.
    async fn text(&self) -> Result<String, DriverError>;

    /// Raw attribute value, `None` when absent.
    async fn attribute(&self, name: &str) -> Result<Option<String>, DriverError>;

    /// Inner markup of the element.
    async fn inner_html(&self) -> Result<String, DriverError>;
}

/// Browser-automation capability.
///
/// Methods take `&mut self`: the orchestrator owns the driver exclusively and
/// lends it out one call at a time.
///
/// # Object Safety
///
/// Uses `async_trait` so components can accept `&mut dyn BrowserDriver`.
#[async_trait]
pub trait BrowserDriver: Send {
    /// Loads `url` in the current page.
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError>;

    /// Reloads the current page.
    async fn reload(&mut self) -> Result<(), DriverError>;

    /// URL of the current page.
    async fn current_url(&mut self) -> Result<String, DriverError>;

    /// Runs a selector query against the current page, in DOM order.
    async fn query(
        &mut self,
        selector: &Selector,
    ) -> Result<Vec<Box<dyn PageElement>>, DriverError>;

    /// Evaluates a script and returns its JSON value (`Null` for `undefined`).
    async fn execute(&mut self, script: &str) -> Result<serde_json::Value, DriverError>;

    /// Full markup of the current page.
    async fn page_source(&mut self) -> Result<String, DriverError>;

    /// Document title of the current page.
    async fn title(&mut self) -> Result<String, DriverError>;

    /// Credentials currently held by the browser.
    async fn cookies(&mut self) -> Result<Vec<Credential>, DriverError>;

    /// Installs credentials into the browser.
    async fn apply_cookies(&mut self, credentials: &[Credential]) -> Result<(), DriverError>;

    /// Prints the current page and returns the base64 payload.
    async fn print_to_document(&mut self, options: &PrintOptions) -> Result<String, DriverError>;

    /// Releases the browser. Later calls are no-ops.
    async fn close(&mut self) -> Result<(), DriverError>;
}

/// Waits until the current page has a body and is past the loading state.
///
/// Returns `false` when `timeout` expires first; callers treat that as
/// best effort and carry on.
pub async fn wait_for_page_ready(driver: &mut dyn BrowserDriver, timeout: Duration) -> bool {
    let probe = async {
        loop {
            match driver.execute(READY_PROBE_SCRIPT).await {
                Ok(serde_json::Value::Bool(true)) => return,
                Ok(_) => {}
                Err(error) => debug!(error = %error, "readiness probe failed"),
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    };

    if tokio::time::timeout(timeout, probe).await.is_ok() {
        true
    } else {
        warn!(
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "page not ready before timeout; continuing"
        );
        false
    }
}
