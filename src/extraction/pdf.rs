//! PDF text extraction
//!
//! Walks each page's content stream keeping the text state (font, spacing, text and
//! line matrices), decodes every shown glyph and groups glyphs into words. A word
//! ends at a whitespace glyph, at a baseline change or at a horizontal gap wider
//! than a fraction of the font size.
//!
//! Boxes are estimated from the baseline and the effective font size, then flipped
//! into a top-left origin frame using the configured page height.

use super::{Fragment, TextExtractor};
use crate::error::ExtractionError;
use crate::layout::BBox;
use ::pdf::content::{Matrix, Op, TextDrawAdjusted};
use ::pdf::error::PdfError;
use ::pdf::file::{CachedFile, FileOptions};
use ::pdf::font::{Font, ToUnicodeMap, Widths};
use ::pdf::object::{Page, Resolve};
use ::pdf::primitive::PdfString;
use std::collections::HashMap;
use std::path::Path;

/// Gap, in units of font size, that separates two words without a space glyph
const WORD_GAP: f32 = 0.25;
/// Share of the font size above the baseline
const ASCENT: f32 = 0.8;
/// Share of the font size below the baseline
const DESCENT: f32 = 0.2;

#[derive(Debug, Clone, Copy)]
pub struct PdfExtractor {
    page_height: f64,
}

impl PdfExtractor {
    pub fn new(page_height: f64) -> Self {
        Self { page_height }
    }
}

impl TextExtractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<Vec<Fragment>, ExtractionError> {
        let file: CachedFile<Vec<u8>> =
            FileOptions::cached().open(path).map_err(|e| ExtractionError::Open {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let mut fragments = Vec::new();
        for index in 0..file.num_pages() {
            let page_no = index + 1;
            let page_err = |e: PdfError| ExtractionError::Page {
                path: path.to_path_buf(),
                page: page_no,
                message: e.to_string(),
            };
            let page = file.get_page(index).map_err(page_err)?;
            let words = page_words(&page, &file).map_err(page_err)?;
            tracing::trace!(page = page_no, words = words.len(), "page read");
            fragments.extend(words.into_iter().map(|w| w.into_fragment(page_no, self.page_height)));
        }
        Ok(fragments)
    }
}

fn page_words(page: &Page, file: &CachedFile<Vec<u8>>) -> Result<Vec<Word>, PdfError> {
    let resolver = file.resolver();
    let fonts = collect_fonts(page, &resolver)?;
    let content = match &page.contents {
        Some(content) => content,
        None => return Ok(Vec::new()),
    };
    let operations = content.operations(&resolver)?;

    let mut state = TextState::default();
    let mut words = WordBuilder::default();
    for op in operations {
        match op {
            Op::BeginText => state.begin_text(),
            Op::EndText => words.flush(),
            Op::SetTextMatrix { matrix } => state.set_text_matrix(matrix),
            Op::MoveTextPosition { translation } => {
                state.translate_line(translation.x, translation.y)
            }
            Op::TextNewline => state.newline(),
            Op::TextFont { name, size } => state.set_font(name.as_str(), size),
            Op::CharSpacing { char_space } => state.char_spacing = char_space,
            Op::WordSpacing { word_space } => state.word_spacing = word_space,
            Op::TextScaling { horiz_scale } => state.horizontal_scale = horiz_scale,
            Op::Leading { leading } => state.leading = leading,
            Op::TextRise { rise } => state.text_rise = rise,
            Op::TextDraw { text } => show_text(&mut state, &fonts, &text, &mut words),
            Op::TextDrawAdjusted { array } => {
                for item in &array {
                    match item {
                        TextDrawAdjusted::Text(text) => {
                            show_text(&mut state, &fonts, text, &mut words)
                        }
                        TextDrawAdjusted::Spacing(amount) => {
                            let adjustment = -amount / 1000.0
                                * state.font_size
                                * (state.horizontal_scale / 100.0);
                            if adjustment != 0.0 {
                                state.translate_text(adjustment);
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }
    words.flush();
    Ok(words.finish())
}

/// Text state carried across text operators
#[derive(Debug)]
struct TextState {
    current_font: Option<String>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
    text_rise: f32,
    text_matrix: Matrix,
    text_line_matrix: Matrix,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            current_font: None,
            font_size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 100.0,
            leading: 0.0,
            text_rise: 0.0,
            text_matrix: Matrix::default(),
            text_line_matrix: Matrix::default(),
        }
    }
}

impl TextState {
    fn begin_text(&mut self) {
        self.text_matrix = Matrix::default();
        self.text_line_matrix = Matrix::default();
    }

    fn set_text_matrix(&mut self, matrix: Matrix) {
        self.text_matrix = matrix;
        self.text_line_matrix = matrix;
    }

    fn set_font(&mut self, name: &str, size: f32) {
        self.current_font = Some(name.to_owned());
        self.font_size = size;
    }

    fn translate_line(&mut self, tx: f32, ty: f32) {
        self.text_line_matrix = multiply(&translation(tx, ty), &self.text_line_matrix);
        self.text_matrix = self.text_line_matrix;
    }

    fn newline(&mut self) {
        self.translate_line(0.0, -self.leading);
    }

    fn translate_text(&mut self, tx: f32) {
        self.text_matrix = multiply(&translation(tx, 0.0), &self.text_matrix);
    }

    /// Current pen position in page space
    fn origin(&self) -> (f32, f32) {
        apply(&self.text_matrix, (0.0, self.text_rise))
    }

    /// Font size as rendered, after the text matrix scale
    fn rendered_size(&self) -> f32 {
        let m = &self.text_matrix;
        (m.c * m.c + m.d * m.d).sqrt() * self.font_size
    }

    fn advance(&self, width: f32, code: u16) -> f32 {
        let mut advance = (width / 1000.0) * self.font_size + self.char_spacing;
        if code == 32 {
            advance += self.word_spacing;
        }
        advance * (self.horizontal_scale / 100.0)
    }
}

fn translation(tx: f32, ty: f32) -> Matrix {
    Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: tx,
        f: ty,
    }
}

fn multiply(left: &Matrix, right: &Matrix) -> Matrix {
    Matrix {
        a: left.a * right.a + left.b * right.c,
        b: left.a * right.b + left.b * right.d,
        c: left.c * right.a + left.d * right.c,
        d: left.c * right.b + left.d * right.d,
        e: left.e * right.a + left.f * right.c + right.e,
        f: left.e * right.b + left.f * right.d + right.f,
    }
}

fn apply(matrix: &Matrix, point: (f32, f32)) -> (f32, f32) {
    (
        matrix.a * point.0 + matrix.c * point.1 + matrix.e,
        matrix.b * point.0 + matrix.d * point.1 + matrix.f,
    )
}

struct ResolvedFont {
    widths: Option<Widths>,
    to_unicode: Option<ToUnicodeMap>,
    is_cid: bool,
}

impl ResolvedFont {
    fn from_font(font: &Font, resolver: &impl Resolve) -> Result<Self, PdfError> {
        let widths = font.widths(resolver)?;
        let to_unicode = match font.to_unicode(resolver) {
            Some(map) => Some(map?),
            None => None,
        };
        Ok(Self {
            widths,
            to_unicode,
            is_cid: font.is_cid(),
        })
    }

    fn glyph_width(&self, code: u16) -> f32 {
        self.widths
            .as_ref()
            .map(|w| w.get(code as usize))
            .unwrap_or(1000.0)
    }
}

/// Decode a shown string into `(code, text)` glyphs
fn decode(font: Option<&ResolvedFont>, text: &PdfString) -> Vec<(u16, String)> {
    let bytes = text.as_bytes();
    let map = font.and_then(|f| f.to_unicode.as_ref());
    let codes: Vec<u16> = match font {
        Some(f) if f.is_cid => bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect(),
        _ => bytes.iter().map(|&b| b as u16).collect(),
    };
    codes
        .into_iter()
        .map(|code| {
            let text = map
                .and_then(|m| m.get(code))
                .map(|s| s.to_string())
                .unwrap_or_else(|| {
                    char::from_u32(code as u32)
                        .unwrap_or('\u{FFFD}')
                        .to_string()
                });
            (code, text)
        })
        .collect()
}

fn collect_fonts(
    page: &Page,
    resolver: &impl Resolve,
) -> Result<HashMap<String, ResolvedFont>, PdfError> {
    let mut fonts = HashMap::new();
    if let Ok(resources) = page.resources() {
        for (name, font_ref) in resources.fonts.iter() {
            let font = font_ref.load(resolver)?;
            let resolved = ResolvedFont::from_font(&font, resolver)?;
            fonts.insert(name.as_str().to_owned(), resolved);
        }
    }
    Ok(fonts)
}

fn show_text(
    state: &mut TextState,
    fonts: &HashMap<String, ResolvedFont>,
    text: &PdfString,
    words: &mut WordBuilder,
) {
    let font = state.current_font.as_ref().and_then(|name| fonts.get(name));
    for (code, glyph) in decode(font, text) {
        let start = state.origin();
        let width = font.map(|f| f.glyph_width(code)).unwrap_or(1000.0);
        let advance = state.advance(width, code);
        state.translate_text(advance);
        let end = state.origin();

        if glyph.trim().is_empty() {
            words.flush();
        } else {
            words.push(&glyph, start, end.0, state.rendered_size());
        }
    }
}

/// A word in PDF space: baseline `y`, horizontal extent `x0..x1`
#[derive(Debug)]
struct Word {
    text: String,
    x0: f32,
    x1: f32,
    baseline: f32,
    size: f32,
}

impl Word {
    fn into_fragment(self, page: u32, page_height: f64) -> Fragment {
        let top = (self.baseline + ASCENT * self.size) as f64;
        let bottom = (self.baseline - DESCENT * self.size) as f64;
        let (x0, x1) = if self.x0 <= self.x1 {
            (self.x0, self.x1)
        } else {
            (self.x1, self.x0)
        };
        Fragment::new(
            page,
            BBox::new(x0 as f64, page_height - top, x1 as f64, page_height - bottom),
            self.text,
        )
    }
}

#[derive(Debug, Default)]
struct WordBuilder {
    current: Option<Word>,
    done: Vec<Word>,
}

impl WordBuilder {
    fn push(&mut self, glyph: &str, start: (f32, f32), end_x: f32, size: f32) {
        let joins = self.current.as_ref().map_or(false, |word| {
            (start.1 - word.baseline).abs() <= size * 0.5
                && start.0 >= word.x0
                && start.0 - word.x1 <= size * WORD_GAP
        });
        if !joins {
            self.flush();
        }
        match &mut self.current {
            Some(word) => {
                word.text.push_str(glyph);
                word.x1 = end_x.max(word.x1);
            }
            None => {
                self.current = Some(Word {
                    text: glyph.to_string(),
                    x0: start.0,
                    x1: end_x,
                    baseline: start.1,
                    size,
                })
            }
        }
    }

    fn flush(&mut self) {
        if let Some(word) = self.current.take() {
            self.done.push(word);
        }
    }

    fn finish(self) -> Vec<Word> {
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_builder_splits_on_gap_and_baseline() {
        let mut words = WordBuilder::default();
        words.push("T", (10.0, 700.0), 16.0, 10.0);
        words.push("o", (16.0, 700.0), 21.0, 10.0);
        // kerning gap below the threshold
        words.push("t", (22.0, 700.0), 25.0, 10.0);
        // wide gap starts a new word
        words.push("1", (60.0, 700.0), 65.0, 10.0);
        // new line
        words.push("2", (10.0, 680.0), 15.0, 10.0);
        words.flush();
        let texts: Vec<_> = words.finish().into_iter().map(|w| w.text).collect();
        assert_eq!(texts, vec!["Tot", "1", "2"]);
    }

    #[test]
    fn test_word_to_top_left_fragment() {
        let word = Word {
            text: "Totale".into(),
            x0: 10.0,
            x1: 40.0,
            baseline: 700.0,
            size: 10.0,
        };
        let fragment = word.into_fragment(1, 800.0);
        assert_eq!(fragment.bbox, BBox::new(10.0, 92.0, 40.0, 102.0));
        assert_eq!(fragment.page, 1);
    }

    #[test]
    fn test_text_state_advances_pen() {
        let mut state = TextState::default();
        state.set_font("F1", 10.0);
        state.translate_line(100.0, 500.0);
        let advance = state.advance(500.0, 65);
        state.translate_text(advance);
        assert_eq!(state.origin(), (105.0, 500.0));
        assert_eq!(state.rendered_size(), 10.0);
    }

    /// One page, one indirect Type1 font, one shown string
    fn single_word_pdf() -> Vec<u8> {
        let content = "BT /F1 10 Tf 100 742 Td (Totale) Tj ET";
        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 595 842] \
             /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
                .to_string(),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
            format!(
                "<< /Length {} >>\nstream\n{}\nendstream",
                content.len(),
                content
            ),
        ];

        let mut pdf = String::from("%PDF-1.4\n");
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, body));
        }
        let xref = pdf.len();
        pdf.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
        for offset in offsets {
            pdf.push_str(&format!("{:010} 00000 n \n", offset));
        }
        pdf.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref
        ));
        pdf.into_bytes()
    }

    #[test]
    fn test_extracts_words_through_indirect_fonts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("form.pdf");
        std::fs::write(&path, single_word_pdf()).unwrap();

        let fragments = PdfExtractor::new(842.0).extract(&path).unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, "Totale");
        assert_eq!(fragments[0].page, 1);
        assert_eq!(fragments[0].bbox.x0, 100.0);
        assert_eq!(fragments[0].bbox.y0, 92.0);
        assert_eq!(fragments[0].bbox.y1, 102.0);
    }

    #[test]
    fn test_missing_document() {
        let result = PdfExtractor::new(842.0).extract(Path::new("/nonexistent/form.pdf"));
        assert!(matches!(result, Err(ExtractionError::Open { .. })));
    }
}
