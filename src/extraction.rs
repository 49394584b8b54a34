//! Text extraction boundary
//!
//! The matcher consumes word-level [`Fragment`]s, each with a page number and a box
//! in the normalized top-left page frame. Where they come from is behind
//! [`TextExtractor`]:
//!
//! - [`PdfExtractor`] reads a PDF document with the `pdf` crate
//! - [`DumpExtractor`] reads a JSON fragment dump written by `formread evaluate`
//!
//! Raw extractor coordinates go through [`normalize`] exactly once before matching.

pub mod dump;
pub mod pdf;

pub use self::dump::{save_fragments, DumpExtractor};
pub use self::pdf::PdfExtractor;

use crate::error::ExtractionError;
use crate::layout::BBox;
use crate::settings::{PageSettings, PageTransform};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One positioned word of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub page: u32,
    pub bbox: BBox,
    pub text: String,
}

impl Fragment {
    pub fn new(page: u32, bbox: BBox, text: impl Into<String>) -> Self {
        Self {
            page,
            bbox,
            text: text.into(),
        }
    }
}

/// Source of positioned text fragments for a whole document
pub trait TextExtractor {
    fn extract(&self, path: &Path) -> Result<Vec<Fragment>, ExtractionError>;

    /// Whether [`extract`](Self::extract) already returns normalized coordinates
    fn is_normalized(&self) -> bool {
        false
    }
}

/// Pick the extractor for a document: JSON dumps are re-read, anything else is a PDF
pub fn extractor_for(path: &Path, page: &PageSettings) -> Box<dyn TextExtractor> {
    let is_dump = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_dump {
        Box::new(DumpExtractor)
    } else {
        Box::new(PdfExtractor::new(page.height))
    }
}

/// Map raw extractor boxes into the normalized frame and sort
pub fn normalize(mut fragments: Vec<Fragment>, page: &PageSettings) -> Vec<Fragment> {
    if page.transform == PageTransform::Rotate180 {
        for fragment in &mut fragments {
            let b = fragment.bbox;
            fragment.bbox = BBox::new(
                page.width - b.x1,
                page.height - b.y1,
                page.width - b.x0,
                page.height - b.y0,
            );
        }
    }
    sort_fragments(&mut fragments);
    fragments
}

/// Sort by page, then top to bottom, then left to right
pub fn sort_fragments(fragments: &mut [Fragment]) {
    fragments.sort_by(|a, b| {
        a.page
            .cmp(&b.page)
            .then(a.bbox.y0.total_cmp(&b.bbox.y0))
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });
}

/// Extract, normalize if needed, and sort
pub fn read_fragments(
    extractor: &dyn TextExtractor,
    path: &Path,
    page: &PageSettings,
) -> Result<Vec<Fragment>, ExtractionError> {
    let fragments = extractor.extract(path)?;
    tracing::debug!(count = fragments.len(), path = %path.display(), "extracted fragments");
    if extractor.is_normalized() {
        let mut fragments = fragments;
        sort_fragments(&mut fragments);
        Ok(fragments)
    } else {
        Ok(normalize(fragments, page))
    }
}
