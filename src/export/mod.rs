//! Document export with an ordered strategy fallback.
//!
//! The default chain is [`NativeExporter`] first and [`BrowserPrintExporter`]
//! second. The first strategy that produces a file wins; a failed attempt is
//! logged and the next strategy runs. Only when every strategy fails is the
//! item reported as failed, and even then the run continues.

mod browser_print;
mod filename;
mod native;
mod render;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::driver::{BrowserDriver, DriverError};
use crate::extract::ExtractedContent;

pub use browser_print::{BrowserPrintExporter, PRINT_MARGIN_IN};
pub use filename::{NATIVE_TITLE_CHARS, PRINT_TITLE_CHARS, UNTITLED, document_file_name, sanitize_title};
pub use native::NativeExporter;
pub use render::{PdfTextDocument, RenderError, first_existing_font};

/// Which strategy produced a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStrategyKind {
    Native,
    BrowserPrint,
}

impl fmt::Display for ExportStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::BrowserPrint => write!(f, "browser-print"),
        }
    }
}

/// Errors from a single export attempt.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The strategy produced no bytes.
    #[error("no document data produced for {path}")]
    EmptyDocument { path: PathBuf },

    /// The font could not render a single line of the content.
    #[error("no line of {path} could be rendered ({skipped_lines} skipped)")]
    NothingRendered { path: PathBuf, skipped_lines: usize },

    #[error("cannot address {path} as a file URL")]
    InvalidPath { path: PathBuf },

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("printed payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// A file written by a strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub path: PathBuf,
    /// Written with a fallback font.
    pub degraded: bool,
}

/// The discovered item a document is written for. Its rank and title name
/// the output file, independent of what the article page calls itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportTarget<'a> {
    pub rank: usize,
    pub title: &'a str,
}

impl<'a> ExportTarget<'a> {
    #[must_use]
    pub fn new(rank: usize, title: &'a str) -> Self {
        Self { rank, title }
    }
}

/// One way of turning extracted content into a document.
#[async_trait]
pub trait ExportStrategy: Send + Sync {
    fn kind(&self) -> ExportStrategyKind;

    /// Path this strategy writes `target` to.
    fn destination(&self, target: ExportTarget<'_>) -> PathBuf;

    /// Writes the document for `target`.
    async fn attempt(
        &self,
        driver: &mut dyn BrowserDriver,
        content: &ExtractedContent,
        target: ExportTarget<'_>,
    ) -> Result<ExportedFile, ExportError>;
}

/// Outcome of exporting one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResult {
    /// Strategy that succeeded; `None` when all failed.
    pub strategy: Option<ExportStrategyKind>,
    /// Written file, or the intended destination when every strategy failed.
    pub output_path: Option<PathBuf>,
    /// Last failure when no strategy succeeded.
    pub failure_reason: Option<String>,
    /// A fallback strategy or fallback font was used.
    pub degraded: bool,
}

impl ExportResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.strategy.is_some()
    }
}

/// Runs export strategies in order until one succeeds.
pub struct DocumentExporter {
    output_dir: PathBuf,
    strategies: Vec<Box<dyn ExportStrategy>>,
}

impl DocumentExporter {
    /// Native export with browser-print fallback.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>, font_candidates: Vec<PathBuf>, ready_timeout: Duration) -> Self {
        let output_dir = output_dir.into();
        let strategies: Vec<Box<dyn ExportStrategy>> = vec![
            Box::new(NativeExporter::new(output_dir.clone(), font_candidates)),
            Box::new(BrowserPrintExporter::new(output_dir.clone(), ready_timeout)),
        ];
        Self::with_strategies(output_dir, strategies)
    }

    #[must_use]
    pub fn with_strategies(output_dir: impl Into<PathBuf>, strategies: Vec<Box<dyn ExportStrategy>>) -> Self {
        Self {
            output_dir: output_dir.into(),
            strategies,
        }
    }

    /// Exports `content` for `target`. Never fails; failures are reported
    /// in the returned [`ExportResult`].
    #[instrument(level = "debug", skip(self, driver, content), fields(rank = target.rank, title = %target.title))]
    pub async fn export(
        &self,
        driver: &mut dyn BrowserDriver,
        content: &ExtractedContent,
        target: ExportTarget<'_>,
    ) -> ExportResult {
        let rank = target.rank;
        if let Err(error) = std::fs::create_dir_all(&self.output_dir) {
            warn!(path = %self.output_dir.display(), error = %error, "cannot create output directory");
            return ExportResult {
                strategy: None,
                output_path: self.strategies.first().map(|strategy| strategy.destination(target)),
                failure_reason: Some(format!(
                    "cannot create output directory {}: {error}",
                    self.output_dir.display()
                )),
                degraded: false,
            };
        }

        let mut last_failure = None;
        let mut last_destination = None;
        for (index, strategy) in self.strategies.iter().enumerate() {
            match strategy.attempt(driver, content, target).await {
                Ok(file) => {
                    let degraded = index > 0 || file.degraded;
                    info!(
                        rank,
                        strategy = %strategy.kind(),
                        path = %file.path.display(),
                        degraded,
                        "document exported"
                    );
                    return ExportResult {
                        strategy: Some(strategy.kind()),
                        output_path: Some(file.path),
                        failure_reason: None,
                        degraded,
                    };
                }
                Err(error) => {
                    warn!(rank, strategy = %strategy.kind(), error = %error, "export strategy failed");
                    last_failure = Some(format!("{}: {error}", strategy.kind()));
                    last_destination = Some(strategy.destination(target));
                }
            }
        }

        ExportResult {
            strategy: None,
            output_path: last_destination,
            failure_reason: Some(last_failure.unwrap_or_else(|| "no export strategy configured".to_string())),
            degraded: false,
        }
    }
}
