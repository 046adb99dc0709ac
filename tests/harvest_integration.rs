//! Full harvest runs against an in-memory site implementing the public
//! driver traits.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use harvester_core::driver::{PageElement, PrintOptions, Selector};
use harvester_core::{
    BrowserDriver, Credential, DriverError, FatalError, HarvestConfig, ItemOutcome, LoginSignal,
    Orchestrator, SameSite, Session, SessionStore,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const LANDING: &str = "https://scys.com/";
const HOT_SECTION: &str = "//div[contains(@class, 'hot')]//a";

#[derive(Clone)]
struct SiteElement {
    text: String,
    href: Option<String>,
    html: String,
}

#[async_trait]
impl PageElement for SiteElement {
    async fn text(&self) -> Result<String, DriverError> {
        Ok(self.text.clone())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, DriverError> {
        Ok(if name == "href" { self.href.clone() } else { None })
    }

    async fn inner_html(&self) -> Result<String, DriverError> {
        Ok(self.html.clone())
    }
}

#[derive(Default, Clone)]
struct SitePage {
    source: String,
    title: String,
    elements: HashMap<String, Vec<SiteElement>>,
}

#[derive(Default)]
struct SiteDriver {
    pages: HashMap<String, SitePage>,
    current: String,
    cookies: Vec<Credential>,
    close_count: usize,
}

impl SiteDriver {
    fn page(&self) -> SitePage {
        self.pages.get(&self.current).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl BrowserDriver for SiteDriver {
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.current = url.to_string();
        Ok(())
    }

    async fn reload(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        Ok(self.current.clone())
    }

    async fn query(
        &mut self,
        selector: &Selector,
    ) -> Result<Vec<Box<dyn PageElement>>, DriverError> {
        Ok(self
            .page()
            .elements
            .get(selector.expression())
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|element| Box::new(element) as Box<dyn PageElement>)
            .collect())
    }

    async fn execute(&mut self, _script: &str) -> Result<serde_json::Value, DriverError> {
        Ok(serde_json::Value::Bool(true))
    }

    async fn page_source(&mut self) -> Result<String, DriverError> {
        Ok(self.page().source)
    }

    async fn title(&mut self) -> Result<String, DriverError> {
        Ok(self.page().title)
    }

    async fn cookies(&mut self) -> Result<Vec<Credential>, DriverError> {
        Ok(self.cookies.clone())
    }

    async fn apply_cookies(&mut self, credentials: &[Credential]) -> Result<(), DriverError> {
        self.cookies = credentials.to_vec();
        Ok(())
    }

    async fn print_to_document(&mut self, _options: &PrintOptions) -> Result<String, DriverError> {
        Err(DriverError::Print("printing unavailable".to_string()))
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.close_count += 1;
        Ok(())
    }
}

struct Immediate;

#[async_trait]
impl LoginSignal for Immediate {
    async fn wait_for_confirmation(&self) {}
}

fn link(text: &str, href: &str) -> SiteElement {
    SiteElement {
        text: text.to_string(),
        href: Some(href.to_string()),
        html: format!("<a href=\"{href}\">{text}</a>"),
    }
}

fn article(title: &str, body: &str) -> SitePage {
    let mut elements = HashMap::new();
    elements.insert(
        "h1".to_string(),
        vec![SiteElement {
            text: title.to_string(),
            href: None,
            html: title.to_string(),
        }],
    );
    elements.insert(
        "//article".to_string(),
        vec![SiteElement {
            text: body.to_string(),
            href: None,
            html: format!("<p>{body}</p>"),
        }],
    );
    SitePage {
        source: format!("<html><body><article>{body}</article></body></html>"),
        title: title.to_string(),
        elements,
    }
}

fn site(landing_links: Vec<SiteElement>) -> SiteDriver {
    let mut landing = SitePage {
        source: "<html><body><a>退出</a><div class=\"hot\"></div></body></html>".to_string(),
        title: "Home".to_string(),
        elements: HashMap::new(),
    };
    landing
        .elements
        .insert(HOT_SECTION.to_string(), landing_links);

    let mut driver = SiteDriver::default();
    driver.pages.insert(LANDING.to_string(), landing);
    driver.pages.insert(
        "https://scys.com/articles/1".to_string(),
        article("First growth playbook", "Line one\n\n\n\nLine two"),
    );
    driver.pages.insert(
        "https://scys.com/articles/2".to_string(),
        article("Second growth playbook", "Another body"),
    );
    driver
}

fn config(temp: &TempDir, count: usize) -> HarvestConfig {
    HarvestConfig {
        base_url: LANDING.to_string(),
        item_count: count,
        pacing: Duration::ZERO,
        output_dir: temp.path().join("out"),
        session_file: temp.path().join("cookies.json"),
        diagnostic_file: temp.path().join("debug_page.html"),
        font_candidates: Vec::new(),
        ..HarvestConfig::default()
    }
}

fn store_session(config: &HarvestConfig) {
    let store = SessionStore::new(&config.session_file, LANDING, config.page_ready_timeout);
    let session = Session::new(vec![Credential::new(
        "token",
        "secret",
        ".scys.com",
        "/",
        SameSite::Lax,
    )]);
    store.persist(&session).unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_harvest_exports_ranked_items_with_stored_session() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp, 2);
    store_session(&config);
    let mut driver = site(vec![
        link("First growth playbook", "/articles/1"),
        link("Second growth playbook", "https://scys.com/articles/2"),
        link("Third growth playbook", "/articles/3"),
    ]);

    let orchestrator = Orchestrator::new(config, CancellationToken::new())
        .unwrap()
        .with_login_signal(Immediate);
    let summary = orchestrator.run(&mut driver).await.unwrap();

    assert_eq!(summary.discovered, 2);
    assert!(!summary.discovery_exhausted);
    assert_eq!(summary.attempted(), 2);
    assert_eq!(summary.succeeded(), 2);
    assert!(!summary.interrupted);
    assert_eq!(driver.close_count, 1);
    assert_eq!(driver.cookies.len(), 1);

    let first = temp.path().join("out").join("01_First growth playbook.pdf");
    let second = temp.path().join("out").join("02_Second growth playbook.pdf");
    for path in [&first, &second] {
        let bytes = std::fs::read(path).unwrap();
        assert!(bytes.starts_with(b"%PDF"), "{} is not a PDF", path.display());
    }
    assert!(
        summary
            .records
            .iter()
            .all(|record| record.outcome.is_success())
    );

    let progress = orchestrator.progress();
    assert_eq!(progress.total(), 2);
    assert_eq!(progress.exported(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_harvest_without_items_is_fatal_and_dumps_page() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp, 3);
    store_session(&config);
    let diagnostic = config.diagnostic_file.clone();
    let mut driver = site(Vec::new());

    let orchestrator = Orchestrator::new(config, CancellationToken::new())
        .unwrap()
        .with_login_signal(Immediate);
    let error = orchestrator.run(&mut driver).await.unwrap_err();

    assert!(matches!(error, FatalError::NoItemsDiscovered { .. }));
    assert_eq!(driver.close_count, 1);
    let dump = std::fs::read_to_string(diagnostic).unwrap();
    assert!(dump.contains("class=\"hot\""));
}

#[tokio::test(start_paused = true)]
async fn test_harvest_skips_items_without_content() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp, 2);
    store_session(&config);
    let mut driver = site(vec![
        link("Missing article page", "/articles/404"),
        link("Second growth playbook", "/articles/2"),
    ]);

    let orchestrator = Orchestrator::new(config, CancellationToken::new())
        .unwrap()
        .with_login_signal(Immediate);
    let summary = orchestrator.run(&mut driver).await.unwrap();

    assert_eq!(summary.attempted(), 2);
    assert_eq!(summary.skipped(), 1);
    assert_eq!(summary.succeeded(), 1);
    assert!(matches!(
        summary.records[0].outcome,
        ItemOutcome::Skipped { .. }
    ));
    assert!(
        temp.path()
            .join("out")
            .join("02_Second growth playbook.pdf")
            .exists()
    );
}
