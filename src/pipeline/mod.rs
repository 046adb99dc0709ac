//! End-to-end harvest run.
//!
//! The [`Orchestrator`] walks a fixed sequence of states:
//!
//! ```text
//! Init -> SessionReady -> Discovering -> Exporting(1..=k) -> Done
//! ```
//!
//! Only two failures are fatal: the browser cannot be started (from `Init`)
//! and discovery finds nothing (from `Discovering`). Every per-item problem
//! becomes an [`ItemOutcome`] and the run moves on to the next item.
//!
//! The driver is lent to each component call as `&mut dyn BrowserDriver` and
//! is closed exactly once when the run ends, whatever the exit path.

mod pacing;
mod progress;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::{ConfigError, HarvestConfig};
use crate::discovery::{ContentItem, ContentLocator, default_strategies};
use crate::driver::{BrowserDriver, ChromiumDriver, DriverError, wait_for_page_ready};
use crate::export::{DocumentExporter, ExportStrategyKind, ExportTarget};
use crate::extract::{ContentExtractor, ExtractionError, default_containers};
use crate::session::{LivenessProbe, LoginSignal, MarkerProbe, SessionStore, StdinConfirmation};

pub use pacing::Pacer;
pub use progress::RunProgress;

/// Position of a run in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    SessionReady,
    Discovering,
    Exporting { index: usize, total: usize },
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::SessionReady => write!(f, "session-ready"),
            Self::Discovering => write!(f, "discovering"),
            Self::Exporting { index, total } => write!(f, "exporting {index}/{total}"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Errors that abort the whole run.
#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("browser unavailable: {0}")]
    DriverUnavailable(#[source] DriverError),

    #[error("no content items found on {url}")]
    NoItemsDiscovered { url: String },
}

/// Final state of one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Exported {
        path: PathBuf,
        strategy: ExportStrategyKind,
    },
    /// Exported through the fallback strategy or with the fallback font.
    Degraded {
        path: PathBuf,
        strategy: ExportStrategyKind,
    },
    /// No content could be extracted.
    Skipped { reason: String },
    Failed { reason: String },
}

impl ItemOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Exported { .. } | Self::Degraded { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    pub item: ContentItem,
    pub outcome: ItemOutcome,
}

/// Result of a run that got past discovery, or was interrupted before it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Items returned by discovery.
    pub discovered: usize,
    /// Discovery returned fewer items than requested.
    pub discovery_exhausted: bool,
    /// One record per attempted item, in rank order.
    pub records: Vec<ItemRecord>,
    /// Cancellation stopped the run early.
    pub interrupted: bool,
    pub output_dir: PathBuf,
}

impl RunSummary {
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.is_success()).count()
    }

    #[must_use]
    pub fn degraded(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, ItemOutcome::Degraded { .. }))
            .count()
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, ItemOutcome::Skipped { .. }))
            .count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, ItemOutcome::Failed { .. }))
            .count()
    }
}

/// Drives session setup, discovery and per-item export.
pub struct Orchestrator {
    config: HarvestConfig,
    base_url: Url,
    store: SessionStore,
    locator: ContentLocator,
    extractor: ContentExtractor,
    exporter: DocumentExporter,
    probe: Box<dyn LivenessProbe>,
    signal: Box<dyn LoginSignal>,
    cancel: CancellationToken,
    progress: Arc<RunProgress>,
}

impl Orchestrator {
    /// Builds an orchestrator with the bundled components.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError::Config`] when `config` fails validation.
    pub fn new(config: HarvestConfig, cancel: CancellationToken) -> Result<Self, FatalError> {
        config.validate()?;
        let base_url = Url::parse(&config.base_url).map_err(|_| ConfigError::InvalidBaseUrl {
            url: config.base_url.clone(),
        })?;

        let store = SessionStore::new(
            &config.session_file,
            base_url.as_str(),
            config.page_ready_timeout,
        );
        let locator = ContentLocator::new(
            default_strategies(),
            base_url.clone(),
            &config.diagnostic_file,
        );
        let extractor = ContentExtractor::new(default_containers(), config.page_ready_timeout);
        let exporter = DocumentExporter::new(
            &config.output_dir,
            config.font_candidates.clone(),
            config.page_ready_timeout,
        );

        Ok(Self {
            config,
            base_url,
            store,
            locator,
            extractor,
            exporter,
            probe: Box::new(MarkerProbe::default()),
            signal: Box::new(StdinConfirmation::default()),
            cancel,
            progress: Arc::new(RunProgress::new()),
        })
    }

    #[must_use]
    pub fn with_probe(mut self, probe: impl LivenessProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    #[must_use]
    pub fn with_login_signal(mut self, signal: impl LoginSignal + 'static) -> Self {
        self.signal = Box::new(signal);
        self
    }

    #[must_use]
    pub fn with_exporter(mut self, exporter: DocumentExporter) -> Self {
        self.exporter = exporter;
        self
    }

    /// Counters updated while the run progresses.
    #[must_use]
    pub fn progress(&self) -> Arc<RunProgress> {
        Arc::clone(&self.progress)
    }

    /// Launches Chrome with the configured options and runs.
    ///
    /// # Errors
    ///
    /// [`FatalError::DriverUnavailable`] when the browser cannot start, plus
    /// everything [`Orchestrator::run`] returns.
    pub async fn launch_and_run(&self) -> Result<RunSummary, FatalError> {
        enter(PipelineState::Init);
        let mut driver = match ChromiumDriver::launch(&self.config.launch).await {
            Ok(driver) => driver,
            Err(error) => {
                enter(PipelineState::Failed);
                return Err(FatalError::DriverUnavailable(error));
            }
        };
        self.run(&mut driver).await
    }

    /// Runs the pipeline on an already started driver and closes it.
    ///
    /// # Errors
    ///
    /// [`FatalError::NoItemsDiscovered`] when discovery finds nothing.
    #[instrument(level = "debug", skip_all, fields(base_url = %self.base_url))]
    pub async fn run(&self, driver: &mut dyn BrowserDriver) -> Result<RunSummary, FatalError> {
        let result = self.run_stages(driver).await;
        if let Err(error) = driver.close().await {
            warn!(error = %error, "browser did not close cleanly");
        }
        enter(if result.is_ok() {
            PipelineState::Done
        } else {
            PipelineState::Failed
        });
        result
    }

    async fn run_stages(&self, driver: &mut dyn BrowserDriver) -> Result<RunSummary, FatalError> {
        let mut summary = RunSummary {
            output_dir: self.config.output_dir.clone(),
            ..RunSummary::default()
        };

        if !self.ensure_session(driver).await {
            warn!("interrupted while waiting for login");
            summary.interrupted = true;
            return Ok(summary);
        }
        enter(PipelineState::SessionReady);

        enter(PipelineState::Discovering);
        let items = self.discover(driver, &mut summary).await?;

        let total = items.len();
        self.progress.set_total(total);
        let mut pacer = Pacer::new(self.config.pacing);

        for (index, item) in items.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                summary.interrupted = true;
                break;
            }
            if index > 0 {
                tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => {
                        summary.interrupted = true;
                        break;
                    }
                    () = pacer.wait() => {}
                }
            }

            enter(PipelineState::Exporting {
                index: index + 1,
                total,
            });
            self.progress.start_item(item.rank);
            let outcome = self.process_item(driver, &item).await;
            pacer.mark_finished();
            summary.records.push(ItemRecord { item, outcome });
        }

        if summary.interrupted {
            warn!(
                attempted = summary.attempted(),
                discovered = summary.discovered,
                "run interrupted"
            );
        }
        Ok(summary)
    }

    /// Returns `false` when cancelled during the interactive login.
    async fn ensure_session(&self, driver: &mut dyn BrowserDriver) -> bool {
        let stored = if self.config.fresh_login {
            info!("fresh login requested; ignoring stored session");
            None
        } else {
            self.store.load()
        };

        if let Some(session) = stored {
            match self.store.validate(driver, &session, self.probe.as_ref()).await {
                Ok(true) => {
                    info!("stored session is valid");
                    return true;
                }
                Ok(false) => info!("stored session has expired"),
                Err(error) => warn!(error = %error, "stored session could not be applied"),
            }
        }

        info!(path = %self.store.path().display(), "interactive login required");
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => false,
            login = self.store.interactive_login(driver, self.signal.as_ref()) => {
                match login {
                    Ok(session) => info!(credentials = session.len(), "login captured"),
                    Err(error) => warn!(error = %error, "login capture failed; continuing with browser state"),
                }
                true
            }
        }
    }

    async fn discover(
        &self,
        driver: &mut dyn BrowserDriver,
        summary: &mut RunSummary,
    ) -> Result<Vec<ContentItem>, FatalError> {
        if let Err(error) = driver.navigate(self.base_url.as_str()).await {
            warn!(error = %error, "landing page did not load");
        }
        wait_for_page_ready(driver, self.config.page_ready_timeout).await;

        let report = self.locator.discover(driver, self.config.item_count).await;
        if report.items.is_empty() {
            return Err(FatalError::NoItemsDiscovered {
                url: self.base_url.to_string(),
            });
        }

        summary.discovered = report.items.len();
        summary.discovery_exhausted = report.exhausted;
        for item in &report.items {
            info!(rank = item.rank, title = %item.title, url = %item.url, "discovered");
        }
        Ok(report.items)
    }

    async fn process_item(&self, driver: &mut dyn BrowserDriver, item: &ContentItem) -> ItemOutcome {
        let content = match self.extractor.extract(driver, &item.url).await {
            Ok(content) => content,
            Err(error @ ExtractionError::NoContainer { .. }) => {
                warn!(rank = item.rank, error = %error, "skipping item without content");
                self.progress.record_skipped();
                return ItemOutcome::Skipped {
                    reason: error.to_string(),
                };
            }
            Err(error) => {
                warn!(rank = item.rank, error = %error, "extraction failed");
                self.progress.record_failed();
                return ItemOutcome::Failed {
                    reason: error.to_string(),
                };
            }
        };

        let result = self
            .exporter
            .export(driver, &content, ExportTarget::new(item.rank, &item.title))
            .await;
        match (result.strategy, result.output_path) {
            (Some(strategy), Some(path)) => {
                self.progress.record_exported(result.degraded);
                if result.degraded {
                    ItemOutcome::Degraded { path, strategy }
                } else {
                    ItemOutcome::Exported { path, strategy }
                }
            }
            _ => {
                self.progress.record_failed();
                ItemOutcome::Failed {
                    reason: result
                        .failure_reason
                        .unwrap_or_else(|| "export failed".to_string()),
                }
            }
        }
    }
}

fn enter(state: PipelineState) {
    debug!(state = %state, "pipeline state");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use tempfile::TempDir;
    use tokio::time::Instant;

    use super::*;
    use crate::driver::fake::{FakeDriver, FakeElement, FakePage};
    use crate::session::{Credential, SameSite, Session};

    const LANDING: &str = "https://scys.com/";
    const HOT_SECTION: &str = "//div[contains(@class, 'hot')]//a";

    struct Immediate;

    #[async_trait]
    impl LoginSignal for Immediate {
        async fn wait_for_confirmation(&self) {}
    }

    struct Never;

    #[async_trait]
    impl LoginSignal for Never {
        async fn wait_for_confirmation(&self) {
            std::future::pending::<()>().await;
        }
    }

    fn config(dir: &TempDir, item_count: usize) -> HarvestConfig {
        HarvestConfig {
            item_count,
            pacing: Duration::ZERO,
            page_ready_timeout: Duration::from_secs(1),
            output_dir: dir.path().join("pdfs"),
            session_file: dir.path().join("cookies.json"),
            diagnostic_file: dir.path().join("debug_page.html"),
            font_candidates: Vec::new(),
            ..HarvestConfig::default()
        }
    }

    fn orchestrator(config: HarvestConfig) -> Orchestrator {
        Orchestrator::new(config, CancellationToken::new())
            .unwrap()
            .with_login_signal(Immediate)
    }

    fn article_url(i: usize) -> String {
        format!("https://scys.com/articles/{i}")
    }

    /// Landing page listing `count` hot articles, each with an article body.
    fn site(count: usize) -> FakeDriver {
        let links = (1..=count)
            .map(|i| FakeElement::link(&format!("热门文章第{i}篇"), &format!("/articles/{i}")))
            .collect();
        let mut driver = FakeDriver::new().with_page(
            LANDING,
            FakePage::new()
                .source("<html><a>退出</a></html>")
                .elements(HOT_SECTION, links),
        );
        for i in 1..=count {
            driver = driver.with_page(
                &article_url(i),
                FakePage::new()
                    .title(&format!("Article {i}"))
                    .elements("//article", vec![FakeElement::block(&format!("Body {i}"), "<p>body</p>")]),
            );
        }
        driver.browser_cookies = vec![Credential::new("token", "t", ".scys.com", "/", SameSite::Lax)];
        driver
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_session_logs_in_before_discovery() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir, 2);
        let session_file = cfg.session_file.clone();
        let mut driver = site(2);

        let summary = orchestrator(cfg).run(&mut driver).await.unwrap();

        let capture = driver.events.iter().position(|e| e == "cookies").unwrap();
        let first_query = driver.events.iter().position(|e| e.starts_with("query:")).unwrap();
        assert!(capture < first_query);
        assert!(session_file.exists());
        assert_eq!(summary.attempted(), 2);
        assert_eq!(summary.succeeded(), 2);
        assert_eq!(driver.close_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_valid_stored_session_skips_login() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir, 1);
        let store = SessionStore::new(&cfg.session_file, LANDING, Duration::from_secs(1));
        store
            .persist(&Session::new(vec![Credential::new("token", "t", ".scys.com", "/", SameSite::Lax)]))
            .unwrap();
        let mut driver = site(1);

        let summary = orchestrator(cfg).with_login_signal(Never).run(&mut driver).await.unwrap();

        assert_eq!(driver.applied_cookies.len(), 1);
        assert!(!driver.events.iter().any(|e| e == "cookies"));
        assert_eq!(summary.succeeded(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_files_are_named_after_discovered_title() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir, 1);
        let output_dir = cfg.output_dir.clone();
        let mut driver = site(1).with_page(
            &article_url(1),
            FakePage::new()
                .title("生财有术 - 社区首页")
                .elements("//article", vec![FakeElement::block("Body 1", "<p>body</p>")]),
        );

        let summary = orchestrator(cfg).run(&mut driver).await.unwrap();

        let expected = output_dir.join("01_热门文章第1篇.pdf");
        match &summary.records[0].outcome {
            ItemOutcome::Exported { path, .. } | ItemOutcome::Degraded { path, .. } => {
                assert_eq!(path, &expected);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(expected.exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_extraction_miss_is_skipped_and_run_continues() {
        let dir = TempDir::new().unwrap();
        let mut driver = site(2).with_page(&article_url(1), FakePage::new().title("empty"));

        let summary = orchestrator(config(&dir, 2)).run(&mut driver).await.unwrap();

        assert_eq!(summary.attempted(), 2);
        assert!(matches!(summary.records[0].outcome, ItemOutcome::Skipped { .. }));
        assert!(summary.records[1].outcome.is_success());
        assert_eq!(summary.skipped(), 1);
        assert!(driver.navigations.contains(&article_url(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_discovery_processes_what_was_found() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir, 5);
        let diagnostic = cfg.diagnostic_file.clone();
        let mut driver = site(3);

        let summary = orchestrator(cfg).run(&mut driver).await.unwrap();

        assert_eq!(summary.discovered, 3);
        assert!(summary.discovery_exhausted);
        assert_eq!(summary.attempted(), 3);
        assert!(summary.succeeded() <= 3);
        assert!(diagnostic.exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_items_is_fatal_and_closes_driver() {
        let dir = TempDir::new().unwrap();
        let mut driver = site(0);

        let result = orchestrator(config(&dir, 5)).run(&mut driver).await;

        assert!(matches!(result, Err(FatalError::NoItemsDiscovered { .. })));
        assert_eq!(driver.close_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_login_closes_driver() {
        let dir = TempDir::new().unwrap();
        let cancel = CancellationToken::new();
        let orchestrator = Orchestrator::new(config(&dir, 2), cancel.clone())
            .unwrap()
            .with_login_signal(Never);
        let mut driver = site(2);
        cancel.cancel();

        let summary = orchestrator.run(&mut driver).await.unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.attempted(), 0);
        assert!(driver.queries.is_empty());
        assert_eq!(driver.close_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_applies_between_items_only() {
        let dir = TempDir::new().unwrap();
        let mut with_pacing = config(&dir, 2);
        with_pacing.pacing = Duration::from_secs(2);
        let mut driver = site(2);
        let orchestrator = orchestrator(with_pacing);

        let start = Instant::now();
        orchestrator.run(&mut driver).await.unwrap();
        let paced = start.elapsed();

        let dir = TempDir::new().unwrap();
        let mut driver = site(2);
        let start = Instant::now();
        self::orchestrator(config(&dir, 2)).run(&mut driver).await.unwrap();
        let unpaced = start.elapsed();

        assert_eq!(paced - unpaced, Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_counters_track_outcomes() {
        let dir = TempDir::new().unwrap();
        let mut driver = site(2).with_page(&article_url(2), FakePage::new());
        let orchestrator = orchestrator(config(&dir, 2));
        let progress = orchestrator.progress();

        orchestrator.run(&mut driver).await.unwrap();

        assert_eq!(progress.total(), 2);
        assert_eq!(progress.exported(), 1);
        assert_eq!(progress.degraded(), 1);
        assert_eq!(progress.skipped(), 1);
    }
}
