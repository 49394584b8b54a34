//! End to end reading of a document
//!
//! [`FormReader`] owns a compiled layout and the runtime settings, and runs the
//! forward pipeline: fragments, matched groups, shaped records, and finally either
//! the re-filed map or the flat record list.

use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::extraction::{read_fragments, Fragment, TextExtractor};
use crate::layout::{compile_layout, Layout, LayoutSource};
use crate::matching::Matcher;
use crate::settings::Settings;
use crate::shaping::{refile, shape_group, Record, Refiled};
use serde::Serialize;
use std::path::Path;

/// Final result of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Output {
    Refiled(Refiled),
    Records(Vec<Record>),
}

/// Everything one document produced
#[derive(Debug, Clone)]
pub struct Reading {
    pub fragments: Vec<Fragment>,
    pub records: Vec<Record>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
pub struct FormReader {
    layout: Layout,
    settings: Settings,
}

impl FormReader {
    pub fn new(layout: Layout, settings: Settings) -> Self {
        Self { layout, settings }
    }

    /// Compile a layout file; compile warnings are returned alongside the reader
    pub fn from_source(source: &LayoutSource, settings: Settings) -> Result<(Self, Diagnostics)> {
        let compiled = compile_layout(source)?;
        tracing::debug!(
            groups = compiled.layout.groups.len(),
            fields = compiled.layout.field_count(),
            "layout compiled"
        );
        Ok((Self::new(compiled.layout, settings), compiled.diagnostics))
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Match and shape sorted fragments
    pub fn records(&self, fragments: &[Fragment], diags: &mut Diagnostics) -> Vec<Record> {
        let matcher = Matcher::new(&self.settings);
        matcher
            .match_layout(&self.layout, fragments, diags)
            .iter()
            .flat_map(|matched| shape_group(matched, diags))
            .collect()
    }

    /// Extract a document and run the whole pipeline on it
    pub fn read(&self, path: &Path, extractor: &dyn TextExtractor) -> Result<Reading> {
        let fragments = read_fragments(extractor, path, &self.settings.page)?;
        let mut diagnostics = Diagnostics::new();
        let records = self.records(&fragments, &mut diagnostics);
        tracing::info!(
            fragments = fragments.len(),
            records = records.len(),
            "document read"
        );
        Ok(Reading {
            fragments,
            records,
            diagnostics,
        })
    }

    /// Re-file records unless re-filing is disabled
    pub fn output(&self, records: Vec<Record>) -> Output {
        if self.settings.refile.enabled {
            Output::Refiled(refile(&records, &self.settings.refile.key_field))
        } else {
            Output::Records(records)
        }
    }
}
