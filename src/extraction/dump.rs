//! JSON fragment dumps
//!
//! `formread evaluate` writes every fragment of a document as a JSON array. Reading
//! such a dump back skips the PDF parse entirely, which makes layouts easy to tune
//! and tests independent of binary fixtures.

use super::{Fragment, TextExtractor};
use crate::error::ExtractionError;
use std::fs;
use std::path::Path;

/// Reads fragments from a JSON dump; coordinates are already normalized
#[derive(Debug, Clone, Copy, Default)]
pub struct DumpExtractor;

impl TextExtractor for DumpExtractor {
    fn extract(&self, path: &Path) -> Result<Vec<Fragment>, ExtractionError> {
        let text = fs::read_to_string(path).map_err(|source| ExtractionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ExtractionError::Dump {
            path: path.to_path_buf(),
            source,
        })
    }

    fn is_normalized(&self) -> bool {
        true
    }
}

/// Write fragments as a pretty-printed JSON array
pub fn save_fragments(path: &Path, fragments: &[Fragment]) -> Result<(), ExtractionError> {
    let io = |source| ExtractionError::Io {
        path: path.to_path_buf(),
        source,
    };
    let json = serde_json::to_string_pretty(fragments).map_err(|e| io(e.into()))?;
    fs::write(path, json).map_err(io)
}
