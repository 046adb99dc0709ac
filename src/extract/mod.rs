//! Article extraction from a content page.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, instrument};
use url::Url;

use crate::driver::{BrowserDriver, DriverError, Selector, wait_for_page_ready};

/// Scrolls that make lazily loaded sections render before extraction.
const SCROLL_SCRIPTS: [&str; 2] = [
    "window.scrollTo(0, document.body.scrollHeight)",
    "window.scrollTo(0, 0)",
];

/// Settle time after each scroll.
const SCROLL_SETTLE: Duration = Duration::from_millis(500);

#[allow(clippy::expect_used)]
static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n[ \t]*(?:\n[ \t]*)+").expect("blank-line regex is valid") // Static pattern, safe to panic
});

/// Content pulled from one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub title: String,
    pub plain_text: String,
    pub raw_markup: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// None of the container selectors matched.
    #[error("no content container found on {url}")]
    NoContainer { url: String },

    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Container selectors tried in order; the first with a match wins.
#[must_use]
pub fn default_containers() -> Vec<Selector> {
    vec![
        Selector::xpath("//article"),
        Selector::xpath("//div[contains(@class, 'content')]"),
        Selector::xpath("//div[contains(@class, 'article')]"),
        Selector::xpath("//div[contains(@class, 'post-content')]"),
        Selector::xpath("//main"),
        Selector::xpath("//body"),
    ]
}

/// Navigates to an item and extracts its title, text and markup.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    containers: Vec<Selector>,
    ready_timeout: Duration,
}

impl ContentExtractor {
    #[must_use]
    pub fn new(containers: Vec<Selector>, ready_timeout: Duration) -> Self {
        Self {
            containers,
            ready_timeout,
        }
    }

    /// Extracts the article at `url`.
    ///
    /// # Errors
    ///
    /// [`ExtractionError::NoContainer`] when no container selector matches;
    /// [`ExtractionError::Driver`] when navigation or a read fails.
    #[instrument(level = "debug", skip(self, driver), fields(url = %url))]
    pub async fn extract(
        &self,
        driver: &mut dyn BrowserDriver,
        url: &Url,
    ) -> Result<ExtractedContent, ExtractionError> {
        driver.navigate(url.as_str()).await?;
        wait_for_page_ready(driver, self.ready_timeout).await;

        for script in SCROLL_SCRIPTS {
            if let Err(error) = driver.execute(script).await {
                debug!(error = %error, "scroll script failed");
            }
            tokio::time::sleep(SCROLL_SETTLE).await;
        }

        let title = self.title(driver).await?;

        for selector in &self.containers {
            let matches = match driver.query(selector).await {
                Ok(matches) => matches,
                Err(error) => {
                    debug!(selector = %selector, error = %error, "container query failed");
                    continue;
                }
            };
            let Some(container) = matches.first() else {
                continue;
            };
            debug!(selector = %selector, "content container matched");
            let text = container.text().await?;
            let raw_markup = container.inner_html().await?;
            return Ok(ExtractedContent {
                title,
                plain_text: collapse_blank_lines(&text),
                raw_markup,
            });
        }

        Err(ExtractionError::NoContainer {
            url: url.to_string(),
        })
    }

    /// First non-empty `h1`, else the document title. An unreadable heading
    /// counts as empty.
    async fn title(&self, driver: &mut dyn BrowserDriver) -> Result<String, DriverError> {
        if let Ok(headings) = driver.query(&Selector::css("h1")).await
            && let Some(heading) = headings.first()
        {
            match heading.text().await {
                Ok(text) if !text.trim().is_empty() => return Ok(text.trim().to_string()),
                Ok(_) => {}
                Err(error) => debug!(error = %error, "heading unreadable"),
            }
        }
        Ok(driver.title().await?.trim().to_string())
    }
}

/// Replaces every run of blank lines with a single empty line.
fn collapse_blank_lines(text: &str) -> String {
    BLANK_RUNS.replace_all(text.trim(), "\n\n").into_owned()
}
