//! Native text-to-PDF export.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::filename::{NATIVE_TITLE_CHARS, document_file_name};
use super::render::{PdfTextDocument, RenderError};
use super::{ExportError, ExportStrategy, ExportStrategyKind, ExportTarget, ExportedFile};
use crate::atomic_file::write_atomic;
use crate::driver::BrowserDriver;
use crate::extract::ExtractedContent;

const TITLE_SIZE_PT: f32 = 16.0;
const BODY_SIZE_PT: f32 = 12.0;

/// Renders the plain text into a PDF with an embedded font.
#[derive(Debug, Clone)]
pub struct NativeExporter {
    output_dir: PathBuf,
    font_candidates: Vec<PathBuf>,
}

impl NativeExporter {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>, font_candidates: Vec<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            font_candidates,
        }
    }
}

struct Rendered {
    bytes: Vec<u8>,
    degraded: bool,
    rendered_lines: usize,
    skipped_lines: usize,
}

fn render(content: &ExtractedContent, font_candidates: &[PathBuf]) -> Result<Rendered, RenderError> {
    let mut doc = PdfTextDocument::new(&content.title, font_candidates)?;
    let mut rendered_lines = 0;
    let mut skipped_lines = 0;

    match doc.append_line(&content.title, TITLE_SIZE_PT) {
        Ok(()) => rendered_lines += 1,
        Err(error) => {
            debug!(error = %error, "title line skipped");
            skipped_lines += 1;
        }
    }
    doc.append_gap(BODY_SIZE_PT);

    for line in content.plain_text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            doc.append_gap(BODY_SIZE_PT);
            continue;
        }
        match doc.append_line(line, BODY_SIZE_PT) {
            Ok(()) => rendered_lines += 1,
            Err(RenderError::UnsupportedGlyph { .. }) => skipped_lines += 1,
            Err(error) => return Err(error),
        }
    }

    let degraded = doc.is_degraded();
    Ok(Rendered {
        bytes: doc.finish()?,
        degraded,
        rendered_lines,
        skipped_lines,
    })
}

#[async_trait]
impl ExportStrategy for NativeExporter {
    fn kind(&self) -> ExportStrategyKind {
        ExportStrategyKind::Native
    }

    fn destination(&self, target: ExportTarget<'_>) -> PathBuf {
        self.output_dir
            .join(document_file_name(target.rank, target.title, NATIVE_TITLE_CHARS, "pdf"))
    }

    async fn attempt(
        &self,
        _driver: &mut dyn BrowserDriver,
        content: &ExtractedContent,
        target: ExportTarget<'_>,
    ) -> Result<ExportedFile, ExportError> {
        let path = self.destination(target);

        let rendered = render(content, &self.font_candidates)?;
        if rendered.rendered_lines == 0 {
            return Err(ExportError::NothingRendered {
                path,
                skipped_lines: rendered.skipped_lines,
            });
        }
        if rendered.skipped_lines > 0 {
            warn!(
                rank = target.rank,
                skipped_lines = rendered.skipped_lines,
                "lines the font cannot render were left out"
            );
        }
        if rendered.bytes.is_empty() {
            return Err(ExportError::EmptyDocument { path });
        }

        write_atomic(&path, &rendered.bytes).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(ExportedFile {
            path,
            degraded: rendered.degraded,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::driver::fake::FakeDriver;

    fn content(title: &str, text: &str) -> ExtractedContent {
        ExtractedContent {
            title: title.to_string(),
            plain_text: text.to_string(),
            raw_markup: format!("<p>{text}</p>"),
        }
    }

    #[tokio::test]
    async fn test_native_export_writes_pdf_with_ranked_name() {
        let dir = TempDir::new().unwrap();
        let exporter = NativeExporter::new(dir.path(), Vec::new());
        let mut driver = FakeDriver::new();

        let exported = exporter
            .attempt(
                &mut driver,
                &content("Site-wide heading", "Line one\n\nLine two"),
                ExportTarget::new(1, "Growth notes: week 1"),
            )
            .await
            .unwrap();

        assert_eq!(exported.path, dir.path().join("01_Growth notes week 1.pdf"));
        assert!(exported.degraded);
        assert!(std::fs::read(&exported.path).unwrap().starts_with(b"%PDF"));
        assert!(driver.navigations.is_empty());
    }

    #[tokio::test]
    async fn test_native_export_into_missing_dir_fails() {
        let dir = TempDir::new().unwrap();
        let exporter = NativeExporter::new(dir.path().join("absent"), Vec::new());
        let mut driver = FakeDriver::new();

        let result = exporter
            .attempt(&mut driver, &content("t", "x"), ExportTarget::new(2, "t"))
            .await;

        assert!(matches!(result, Err(ExportError::Io { .. })));
    }

    #[tokio::test]
    async fn test_native_export_with_nothing_renderable_fails() {
        let dir = TempDir::new().unwrap();
        let exporter = NativeExporter::new(dir.path(), Vec::new());
        let mut driver = FakeDriver::new();

        let result = exporter
            .attempt(
                &mut driver,
                &content("热门文章第一篇", "第一段\n\n第二段"),
                ExportTarget::new(1, "热门文章第一篇"),
            )
            .await;

        assert!(matches!(
            result,
            Err(ExportError::NothingRendered { skipped_lines: 3, .. })
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_native_export_keeps_partly_renderable_content() {
        let dir = TempDir::new().unwrap();
        let exporter = NativeExporter::new(dir.path(), Vec::new());
        let mut driver = FakeDriver::new();

        let exported = exporter
            .attempt(
                &mut driver,
                &content("热门文章", "Plain line\n第二段"),
                ExportTarget::new(1, "热门文章"),
            )
            .await
            .unwrap();

        assert_eq!(exported.path, dir.path().join("01_热门文章.pdf"));
        assert!(exported.path.exists());
    }
}
