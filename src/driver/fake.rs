//! Scripted in-memory driver for unit tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use super::{BrowserDriver, DriverError, PageElement, PrintOptions, READY_PROBE_SCRIPT, Selector};
use crate::session::Credential;

/// Canned element.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeElement {
    text: String,
    html: String,
    attributes: HashMap<String, String>,
    /// Reads fail as if the node left the DOM.
    detached: bool,
}

impl FakeElement {
    pub(crate) fn link(text: &str, href: &str) -> Self {
        let mut attributes = HashMap::new();
        attributes.insert("href".to_string(), href.to_string());
        Self {
            text: text.to_string(),
            html: text.to_string(),
            attributes,
            detached: false,
        }
    }

    pub(crate) fn block(text: &str, html: &str) -> Self {
        Self {
            text: text.to_string(),
            html: html.to_string(),
            attributes: HashMap::new(),
            detached: false,
        }
    }

    pub(crate) fn detached() -> Self {
        Self {
            detached: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl PageElement for FakeElement {
    async fn text(&self) -> Result<String, DriverError> {
        if self.detached {
            return Err(DriverError::Script("node is detached".to_string()));
        }
        Ok(self.text.clone())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, DriverError> {
        Ok(self.attributes.get(name).cloned())
    }

    async fn inner_html(&self) -> Result<String, DriverError> {
        Ok(self.html.clone())
    }
}

/// Canned page served for one URL.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakePage {
    source: String,
    title: String,
    elements: HashMap<String, Vec<FakeElement>>,
    failing: HashSet<String>,
}

impl FakePage {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn source(mut self, source: &str) -> Self {
        self.source = source.to_string();
        self
    }

    pub(crate) fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// Elements returned for a selector expression (CSS or XPath text).
    pub(crate) fn elements(mut self, expression: &str, elements: Vec<FakeElement>) -> Self {
        self.elements.insert(expression.to_string(), elements);
        self
    }

    /// Makes queries for `expression` fail.
    pub(crate) fn failing_query(mut self, expression: &str) -> Self {
        self.failing.insert(expression.to_string());
        self
    }
}

/// Driver double that serves canned pages and records every interaction.
pub(crate) struct FakeDriver {
    pages: HashMap<String, FakePage>,
    current: Option<String>,
    ready: bool,
    /// Every call in order, e.g. `navigate:https://...`, `query:<expr>`.
    pub(crate) events: Vec<String>,
    pub(crate) navigations: Vec<String>,
    pub(crate) reloads: usize,
    pub(crate) queries: Vec<String>,
    pub(crate) scripts: Vec<String>,
    pub(crate) applied_cookies: Vec<Vec<Credential>>,
    pub(crate) browser_cookies: Vec<Credential>,
    pub(crate) fail_cookie_apply: bool,
    pub(crate) failing_urls: HashSet<String>,
    pub(crate) print_payload: Result<String, String>,
    pub(crate) printed: Vec<(String, PrintOptions)>,
    pub(crate) close_count: usize,
}

impl FakeDriver {
    pub(crate) fn new() -> Self {
        Self {
            pages: HashMap::new(),
            current: None,
            ready: true,
            events: Vec::new(),
            navigations: Vec::new(),
            reloads: 0,
            queries: Vec::new(),
            scripts: Vec::new(),
            applied_cookies: Vec::new(),
            browser_cookies: Vec::new(),
            fail_cookie_apply: false,
            failing_urls: HashSet::new(),
            print_payload: Ok(STANDARD.encode(b"%PDF-1.4\n% printed\n")),
            printed: Vec::new(),
            close_count: 0,
        }
    }

    pub(crate) fn with_page(mut self, url: &str, page: FakePage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    pub(crate) fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    fn page(&self) -> Option<&FakePage> {
        self.current.as_ref().and_then(|url| self.pages.get(url))
    }
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.events.push(format!("navigate:{url}"));
        self.navigations.push(url.to_string());
        if self.failing_urls.contains(url) {
            return Err(DriverError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_CONNECTION_RESET".to_string(),
            });
        }
        self.current = Some(url.to_string());
        Ok(())
    }

    async fn reload(&mut self) -> Result<(), DriverError> {
        self.reloads += 1;
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        Ok(self.current.clone().unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn query(
        &mut self,
        selector: &Selector,
    ) -> Result<Vec<Box<dyn PageElement>>, DriverError> {
        let expression = selector.expression().to_string();
        self.events.push(format!("query:{expression}"));
        self.queries.push(expression.clone());
        let Some(page) = self.page() else {
            return Ok(Vec::new());
        };
        if page.failing.contains(&expression) {
            return Err(DriverError::Query {
                selector: selector.to_string(),
                reason: "invalid expression".to_string(),
            });
        }
        Ok(page
            .elements
            .get(&expression)
            .map(|elements| {
                elements
                    .iter()
                    .cloned()
                    .map(|element| Box::new(element) as Box<dyn PageElement>)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn execute(&mut self, script: &str) -> Result<serde_json::Value, DriverError> {
        if script == READY_PROBE_SCRIPT {
            return Ok(serde_json::Value::Bool(self.ready));
        }
        self.scripts.push(script.to_string());
        Ok(serde_json::Value::Null)
    }

    async fn page_source(&mut self) -> Result<String, DriverError> {
        Ok(self.page().map(|page| page.source.clone()).unwrap_or_default())
    }

    async fn title(&mut self) -> Result<String, DriverError> {
        Ok(self.page().map(|page| page.title.clone()).unwrap_or_default())
    }

    async fn cookies(&mut self) -> Result<Vec<Credential>, DriverError> {
        self.events.push("cookies".to_string());
        Ok(self.browser_cookies.clone())
    }

    async fn apply_cookies(&mut self, credentials: &[Credential]) -> Result<(), DriverError> {
        if self.fail_cookie_apply {
            return Err(DriverError::Cookies("cookie domain mismatch".to_string()));
        }
        self.events.push("apply_cookies".to_string());
        self.applied_cookies.push(credentials.to_vec());
        Ok(())
    }

    async fn print_to_document(&mut self, options: &PrintOptions) -> Result<String, DriverError> {
        let url = self.current.clone().unwrap_or_default();
        self.events.push("print".to_string());
        self.printed.push((url, options.clone()));
        self.print_payload.clone().map_err(DriverError::Print)
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.events.push("close".to_string());
        self.close_count += 1;
        Ok(())
    }
}
