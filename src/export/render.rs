//! Line-oriented PDF text rendering on top of `printpdf`.

use std::fs;
use std::path::{Path, PathBuf};

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use tracing::{debug, warn};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 15.0;
const PT_TO_MM: f32 = 0.3528;
const LINE_SPACING: f32 = 1.5;
const LAYER_NAME: &str = "Layer 1";

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The font file exists but could not be loaded.
    #[error("failed to load font {path}: {reason}")]
    Font { path: PathBuf, reason: String },

    /// The active font has no glyph for a character of the line.
    #[error("font cannot render character {ch:?}")]
    UnsupportedGlyph { ch: char },

    #[error("pdf generation failed: {0}")]
    Pdf(String),
}

/// First candidate that exists on disk.
#[must_use]
pub fn first_existing_font(candidates: &[PathBuf]) -> Option<&Path> {
    candidates
        .iter()
        .map(PathBuf::as_path)
        .find(|path| path.is_file())
}

enum Coverage {
    /// Glyph lookup in the embedded font's cmap.
    Embedded(Vec<u8>),
    /// Built-in Helvetica: WinAnsi (Latin-1) only.
    Latin1,
}

impl Coverage {
    fn check(&self, line: &str) -> Result<(), RenderError> {
        match self {
            Self::Embedded(bytes) => {
                let face = ttf_parser::Face::parse(bytes, 0)
                    .map_err(|e| RenderError::Pdf(e.to_string()))?;
                match line
                    .chars()
                    .find(|c| !c.is_whitespace() && face.glyph_index(*c).is_none())
                {
                    Some(ch) => Err(RenderError::UnsupportedGlyph { ch }),
                    None => Ok(()),
                }
            }
            Self::Latin1 => match line
                .chars()
                .find(|c| u32::from(*c) > 0xFF || (c.is_control() && *c != '\t'))
            {
                Some(ch) => Err(RenderError::UnsupportedGlyph { ch }),
                None => Ok(()),
            },
        }
    }
}

/// An A4 text document written top to bottom.
pub struct PdfTextDocument {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    coverage: Coverage,
    cursor_mm: f32,
    degraded: bool,
}

impl PdfTextDocument {
    /// Starts a document using the first available candidate font, or the
    /// built-in Helvetica when none loads (the document is then degraded).
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Pdf`] when not even the built-in font loads.
    pub fn new(title: &str, font_candidates: &[PathBuf]) -> Result<Self, RenderError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), LAYER_NAME);

        let embedded = first_existing_font(font_candidates).and_then(|path| {
            match load_font(&doc, path) {
                Ok(loaded) => Some(loaded),
                Err(error) => {
                    warn!(error = %error, "font unusable; trying built-in font");
                    None
                }
            }
        });

        let (font, coverage, degraded) = if let Some((font, bytes)) = embedded {
            (font, Coverage::Embedded(bytes), false)
        } else {
            warn!("no CJK-capable font available; non-Latin text will be skipped");
            let font = doc
                .add_builtin_font(BuiltinFont::Helvetica)
                .map_err(|e| RenderError::Pdf(e.to_string()))?;
            (font, Coverage::Latin1, true)
        };

        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            font,
            coverage,
            cursor_mm: PAGE_HEIGHT_MM - MARGIN_MM,
            degraded,
        })
    }

    /// Whether the built-in fallback font is in use.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Appends one logical line, wrapped to the page width.
    ///
    /// # Errors
    ///
    /// [`RenderError::UnsupportedGlyph`] when the font cannot render the
    /// line; nothing is written in that case.
    pub fn append_line(&mut self, line: &str, size_pt: f32) -> Result<(), RenderError> {
        self.coverage.check(line)?;
        for segment in wrap(line, size_pt) {
            self.advance(size_pt * PT_TO_MM * LINE_SPACING);
            self.layer.use_text(
                segment,
                size_pt,
                Mm(MARGIN_MM),
                Mm(self.cursor_mm),
                &self.font,
            );
        }
        Ok(())
    }

    /// Vertical blank space.
    pub fn append_gap(&mut self, size_pt: f32) {
        self.advance(size_pt * PT_TO_MM * LINE_SPACING);
    }

    /// Serializes the document.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Pdf`] if serialization fails.
    pub fn finish(self) -> Result<Vec<u8>, RenderError> {
        self.doc
            .save_to_bytes()
            .map_err(|e| RenderError::Pdf(e.to_string()))
    }

    fn advance(&mut self, height_mm: f32) {
        if self.cursor_mm - height_mm < MARGIN_MM {
            let (page, layer) =
                self.doc
                    .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), LAYER_NAME);
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.cursor_mm = PAGE_HEIGHT_MM - MARGIN_MM;
        }
        self.cursor_mm -= height_mm;
    }
}

fn load_font(doc: &PdfDocumentReference, path: &Path) -> Result<(IndirectFontRef, Vec<u8>), RenderError> {
    let bytes = fs::read(path).map_err(|e| RenderError::Font {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    ttf_parser::Face::parse(&bytes, 0).map_err(|e| RenderError::Font {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let font = doc
        .add_external_font(bytes.as_slice())
        .map_err(|e| RenderError::Font {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    debug!(path = %path.display(), "embedded font loaded");
    Ok((font, bytes))
}

/// Approximate advance of `c` in ems: full width for wide scripts.
fn char_width_em(c: char) -> f32 {
    if u32::from(c) >= 0x2E80 { 1.0 } else { 0.55 }
}

/// Splits `line` into segments that fit between the page margins.
fn wrap(line: &str, size_pt: f32) -> Vec<String> {
    let available_mm = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut width_mm = 0.0;
    for c in line.chars() {
        let advance = char_width_em(c) * size_pt * PT_TO_MM;
        if width_mm + advance > available_mm && !current.is_empty() {
            segments.push(std::mem::take(&mut current));
            width_mm = 0.0;
        }
        current.push(c);
        width_mm += advance;
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}
