//! Ranked content discovery on the landing page.
//!
//! [`ContentLocator`] runs an ordered cascade of [`DiscoveryStrategy`] rules
//! against the page currently loaded in the driver. Candidates are accepted
//! in DOM order until the target count is reached, at which point the whole
//! cascade stops. When the cascade under-delivers, the page markup is dumped
//! to a diagnostic file so the selectors can be adjusted.

mod strategy;

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::atomic_file::write_atomic;
use crate::driver::{BrowserDriver, PageElement};

pub use strategy::{CandidateFilter, DiscoveryStrategy, NAVIGATION_KEYWORDS, default_strategies};

/// One discovered item. Ranks are dense from 1 in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    pub rank: usize,
    pub title: String,
    pub url: Url,
}

/// Result of one discovery run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub items: Vec<ContentItem>,
    /// Every strategy ran and fewer than the requested count were found.
    pub exhausted: bool,
}

/// Locates up to `n` content items via a strategy cascade.
#[derive(Debug, Clone)]
pub struct ContentLocator {
    strategies: Vec<DiscoveryStrategy>,
    fallback_base: Url,
    diagnostic_path: PathBuf,
}

impl ContentLocator {
    /// Creates a locator.
    ///
    /// `fallback_base` resolves relative links when the driver cannot report
    /// the current page URL.
    #[must_use]
    pub fn new(
        strategies: Vec<DiscoveryStrategy>,
        fallback_base: Url,
        diagnostic_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            strategies,
            fallback_base,
            diagnostic_path: diagnostic_path.into(),
        }
    }

    #[must_use]
    pub fn strategies(&self) -> &[DiscoveryStrategy] {
        &self.strategies
    }

    /// Runs the cascade on the current page and returns at most `n` items.
    #[instrument(level = "debug", skip(self, driver))]
    pub async fn discover(&self, driver: &mut dyn BrowserDriver, n: usize) -> DiscoveryReport {
        let page_url = self.page_url(driver).await;
        let mut items: Vec<ContentItem> = Vec::with_capacity(n);
        let mut seen: HashSet<String> = HashSet::new();

        for strategy in &self.strategies {
            if items.len() >= n {
                break;
            }
            let elements = match driver.query(&strategy.selector).await {
                Ok(elements) => elements,
                Err(error) => {
                    warn!(strategy = %strategy.name, error = %error, "discovery strategy failed; skipping");
                    continue;
                }
            };

            let before = items.len();
            for element in &elements {
                if items.len() >= n {
                    break;
                }
                let Some((title, url)) = candidate(element.as_ref(), &page_url).await else {
                    continue;
                };
                if !strategy.filter.accepts(&title, &url, &page_url) {
                    continue;
                }
                if !seen.insert(url.as_str().to_string()) {
                    continue;
                }
                items.push(ContentItem {
                    rank: items.len() + 1,
                    title,
                    url,
                });
            }
            debug!(
                strategy = %strategy.name,
                matched = elements.len(),
                accepted = items.len() - before,
                "discovery strategy evaluated"
            );
        }

        let exhausted = items.len() < n;
        if exhausted {
            warn!(found = items.len(), wanted = n, "discovery found fewer items than requested");
            self.write_diagnostic(driver).await;
        }
        info!(found = items.len(), "discovery complete");
        DiscoveryReport { items, exhausted }
    }

    async fn page_url(&self, driver: &mut dyn BrowserDriver) -> Url {
        match driver.current_url().await.map(|raw| Url::parse(&raw)) {
            Ok(Ok(url)) if matches!(url.scheme(), "http" | "https") => url,
            _ => self.fallback_base.clone(),
        }
    }

    async fn write_diagnostic(&self, driver: &mut dyn BrowserDriver) {
        let markup = match driver.page_source().await {
            Ok(markup) => markup,
            Err(error) => {
                warn!(error = %error, "could not read page markup for diagnostics");
                return;
            }
        };
        match write_atomic(&self.diagnostic_path, markup.as_bytes()) {
            Ok(()) => info!(path = %self.diagnostic_path.display(), "page markup saved for inspection"),
            Err(error) => warn!(
                path = %self.diagnostic_path.display(),
                error = %error,
                "failed to write diagnostic snapshot"
            ),
        }
    }
}

/// Extracts a normalized `(title, absolute url)` pair from an anchor.
async fn candidate(element: &dyn PageElement, page_url: &Url) -> Option<(String, Url)> {
    let text = element.text().await.ok()?;
    let title = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if title.is_empty() {
        return None;
    }
    let href = element.attribute("href").await.ok()??;
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let url = page_url.join(href).ok()?;
    matches!(url.scheme(), "http" | "https").then_some((title, url))
}
