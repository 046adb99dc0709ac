//! Discovery strategies and their candidate filters.

use url::Url;

use crate::driver::Selector;

/// Navigation paths never treated as content by the same-site sweep.
pub const NAVIGATION_KEYWORDS: [&str; 4] = ["login", "register", "about", "help"];

/// Acceptance rules applied to each `(text, url)` candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFilter {
    /// Minimum title length in characters.
    pub min_text_chars: usize,
    /// Only accept URLs on the landing page's host.
    pub same_site_only: bool,
    /// Reject URLs containing any of these substrings (case-insensitive).
    pub excluded_url_keywords: Vec<String>,
}

impl CandidateFilter {
    /// Accepts titles longer than five characters from any site.
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            min_text_chars: 6,
            same_site_only: false,
            excluded_url_keywords: Vec::new(),
        }
    }

    /// Long titles on the landing host, excluding navigation pages.
    #[must_use]
    pub fn same_site_sweep() -> Self {
        Self {
            min_text_chars: 11,
            same_site_only: true,
            excluded_url_keywords: NAVIGATION_KEYWORDS.iter().map(ToString::to_string).collect(),
        }
    }

    /// Whether the candidate passes this filter.
    #[must_use]
    pub fn accepts(&self, text: &str, url: &Url, page_url: &Url) -> bool {
        if text.chars().count() < self.min_text_chars {
            return false;
        }
        if self.same_site_only && url.host_str() != page_url.host_str() {
            return false;
        }
        let lowered = url.as_str().to_lowercase();
        !self
            .excluded_url_keywords
            .iter()
            .any(|keyword| lowered.contains(&keyword.to_lowercase()))
    }
}

/// A named `(selector, filter)` rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryStrategy {
    pub name: String,
    pub selector: Selector,
    pub filter: CandidateFilter,
}

impl DiscoveryStrategy {
    #[must_use]
    pub fn new(name: impl Into<String>, selector: Selector, filter: CandidateFilter) -> Self {
        Self {
            name: name.into(),
            selector,
            filter,
        }
    }
}

/// Built-in cascade for the platform's hot list, most specific first.
#[must_use]
pub fn default_strategies() -> Vec<DiscoveryStrategy> {
    let lenient = |name: &str, xpath: &str| {
        DiscoveryStrategy::new(name, Selector::xpath(xpath), CandidateFilter::lenient())
    };
    vec![
        lenient("hot-section", "//div[contains(@class, 'hot')]//a"),
        lenient(
            "hot-heading",
            "//div[contains(text(), '热门')]/..//a | \
             //h2[contains(text(), '热门')]/following-sibling::div//a",
        ),
        lenient("hot-block", "//section[contains(@class, 'hot')]//a"),
        lenient("list-item", "//div[@class='list-item']//a"),
        lenient("article-link", "//article//a[@href]"),
        lenient(
            "title-class",
            "//a[contains(@class, 'title') or contains(@class, 'post') or contains(@class, 'article')]",
        ),
        DiscoveryStrategy::new(
            "same-site-sweep",
            Selector::xpath("//a[@href]"),
            CandidateFilter::same_site_sweep(),
        ),
    ]
}
