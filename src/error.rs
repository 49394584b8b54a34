//! Fatal errors
//!
//! Only two things abort a run: a layout that does not validate and a document that
//! cannot be read. Everything recoverable travels as a [`Diagnostic`] instead.
//!
//! [`Diagnostic`]: crate::diagnostics::Diagnostic

use crate::diagnostics::Diagnostics;
use std::path::PathBuf;
use thiserror::Error;

/// The layout file could not be turned into a field model
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("cannot read layout '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("layout syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// Every section was checked; `diagnostics` holds the complete report
    #[error("layout validation failed with {} error(s)", .diagnostics.error_count())]
    Validation { diagnostics: Diagnostics },
}

/// The text extraction service cannot be used on a document
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("unable to open document '{path}': {message}")]
    Open { path: PathBuf, message: String },

    #[error("unable to read page {page} of '{path}': {message}")]
    Page {
        path: PathBuf,
        page: u32,
        message: String,
    },

    #[error("malformed fragment dump '{path}': {source}")]
    Dump {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Runtime settings could not be loaded
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid settings: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid setting '{key}': {message}")]
    Value { key: &'static str, message: String },
}

/// Any fatal error of a full read
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
