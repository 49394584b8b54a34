//! # formread
//!
//! Declarative field extraction from paginated forms.
//!
//! A layout file maps named rectangles of a page (single values, repeated rows or
//! 2-D tables) to typed fields. Reading a document runs a strictly forward pipeline:
//!
//! ```text
//! layout file --[layout]--> field descriptors
//! document --[extraction]--> fragments
//! descriptors + fragments --[matching]--> matched fields
//! matched fields --[shaping]--> records --[refile]--> keyed result map
//! ```
//!
//! - [`layout`]: layout file reader, range grammar and compiler
//! - [`extraction`]: positioned text fragments from PDFs or JSON dumps
//! - [`matching`]: aggregation, casting and start/stop activation
//! - [`shaping`]: output shapes and re-filing
//! - [`pipeline`]: [`FormReader`](pipeline::FormReader), the whole run in one place
//!
//! Recoverable problems never abort a run; they are collected as
//! [`diagnostics::Diagnostic`]s and handed back to the caller.

pub mod diagnostics;
pub mod error;
pub mod extraction;
pub mod layout;
pub mod matching;
pub mod pipeline;
pub mod settings;
pub mod shaping;

pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::{Error, Result};
pub use pipeline::{FormReader, Output, Reading};
pub use settings::Settings;
