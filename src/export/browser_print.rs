//! Export by printing the article markup through the browser.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;
use url::Url;

use super::filename::{PRINT_TITLE_CHARS, document_file_name};
use super::{ExportError, ExportStrategy, ExportStrategyKind, ExportTarget, ExportedFile};
use crate::atomic_file::{discard, write_atomic};
use crate::driver::{BrowserDriver, PrintOptions, wait_for_page_ready};
use crate::extract::ExtractedContent;

/// Margin on every side of the printed page, in inches.
pub const PRINT_MARGIN_IN: f64 = 0.4;

/// Wraps the markup in a standalone HTML page, opens it in the browser and
/// prints it to PDF. The intermediate page is removed afterwards.
#[derive(Debug, Clone)]
pub struct BrowserPrintExporter {
    output_dir: PathBuf,
    ready_timeout: Duration,
}

impl BrowserPrintExporter {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>, ready_timeout: Duration) -> Self {
        Self {
            output_dir: output_dir.into(),
            ready_timeout,
        }
    }

    async fn print(
        &self,
        driver: &mut dyn BrowserDriver,
        html_path: &Path,
        pdf_path: &Path,
    ) -> Result<(), ExportError> {
        let absolute = std::path::absolute(html_path).map_err(|source| ExportError::Io {
            path: html_path.to_path_buf(),
            source,
        })?;
        let file_url = Url::from_file_path(&absolute).map_err(|()| ExportError::InvalidPath {
            path: absolute.clone(),
        })?;

        driver.navigate(file_url.as_str()).await?;
        wait_for_page_ready(driver, self.ready_timeout).await;

        let payload = driver
            .print_to_document(&PrintOptions::portrait_a4(PRINT_MARGIN_IN))
            .await?;
        let bytes = STANDARD.decode(payload.trim())?;
        if bytes.is_empty() {
            return Err(ExportError::EmptyDocument {
                path: pdf_path.to_path_buf(),
            });
        }

        write_atomic(pdf_path, &bytes).map_err(|source| ExportError::Io {
            path: pdf_path.to_path_buf(),
            source,
        })
    }
}

/// Escapes text for use inside HTML element content and attributes.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn standalone_page(title: &str, markup: &str) -> String {
    let title = escape_html(title);
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
         <style>body {{ font-family: sans-serif; line-height: 1.6; margin: 20px; }} \
         img {{ max-width: 100%; }}</style>\n</head>\n<body>\n<h1>{title}</h1>\n{markup}\n</body>\n</html>\n"
    )
}

#[async_trait]
impl ExportStrategy for BrowserPrintExporter {
    fn kind(&self) -> ExportStrategyKind {
        ExportStrategyKind::BrowserPrint
    }

    fn destination(&self, target: ExportTarget<'_>) -> PathBuf {
        self.output_dir
            .join(document_file_name(target.rank, target.title, PRINT_TITLE_CHARS, "pdf"))
    }

    async fn attempt(
        &self,
        driver: &mut dyn BrowserDriver,
        content: &ExtractedContent,
        target: ExportTarget<'_>,
    ) -> Result<ExportedFile, ExportError> {
        let html_path = self
            .output_dir
            .join(document_file_name(target.rank, target.title, PRINT_TITLE_CHARS, "html"));
        let pdf_path = self.destination(target);

        let page = standalone_page(&content.title, &content.raw_markup);
        write_atomic(&html_path, page.as_bytes()).map_err(|source| ExportError::Io {
            path: html_path.clone(),
            source,
        })?;

        let printed = self.print(driver, &html_path, &pdf_path).await;
        discard(&html_path);
        debug!(path = %html_path.display(), "intermediate page removed");

        printed.map(|()| ExportedFile {
            path: pdf_path,
            degraded: false,
        })
    }
}
