//! Range grammar for `rows` and `columns`
//!
//! A grammar string is lexed ([`tokens`]), parsed into an explicit item list
//! ([`parser`]) and finally laid over one axis of the section's region
//! ([`expand`]), producing contiguous [`RangeToken`]s.

pub mod expand;
pub mod parser;
pub mod tokens;

pub use expand::{expand_axis, expand_label, RangeToken};
pub use parser::{parse_range, Form, Label, ParseError, RangeItem, RangeSpec};
