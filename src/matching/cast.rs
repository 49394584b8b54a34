//! Casting aggregated text to a field's kind
//!
//! A trailing minus not preceded by another minus is a sign marker and moves to the
//! front before coercion (`"123-"` becomes `"-123"`). This happens for every kind.

use super::Load;
use crate::layout::FieldKind;
use crate::settings::CastingSettings;
use chrono::format::{self, ParseResult, Parsed, StrftimeItems};
use chrono::NaiveDate;
use std::borrow::Cow;
use std::fmt::Write;

/// Move a trailing sign marker to the front
pub fn move_sign(text: &str) -> Cow<'_, str> {
    match text.strip_suffix('-') {
        Some(rest) if !rest.ends_with('-') => Cow::Owned(format!("-{}", rest.trim())),
        _ => Cow::Borrowed(text),
    }
}

/// Coerce aggregated text into `kind`
///
/// The error carries a human readable reason; the caller decides what to keep.
pub fn cast(text: &str, kind: &FieldKind, settings: &CastingSettings) -> Result<Load, String> {
    if text.is_empty() {
        return Ok(match kind {
            FieldKind::Bool => Load::Bool(false),
            _ => Load::Text(String::new()),
        });
    }

    let text = move_sign(text);
    match kind {
        FieldKind::Str => Ok(Load::Text(text.into_owned())),
        FieldKind::Bool => Ok(Load::Bool(true)),
        FieldKind::Int => text
            .trim()
            .parse::<i64>()
            .map(Load::Int)
            .map_err(|e| format!("'{}' is not an int: {}", text, e)),
        FieldKind::Float => {
            let normalized = text.replace('.', "").replace(',', ".");
            normalized
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Load::Float)
                .ok_or_else(|| format!("'{}' is not a float", text))
        }
        FieldKind::Date { format } => {
            let input = format.as_deref().unwrap_or(&settings.date_format);
            let date = parse_date(text.trim(), input)
                .map_err(|e| format!("'{}' does not match date format '{}': {}", text, input, e))?;
            let mut out = String::new();
            write!(out, "{}", date.format(&settings.date_output))
                .map_err(|_| format!("invalid date output format '{}'", settings.date_output))?;
            Ok(Load::Text(out))
        }
    }
}

/// Parse `text` with a strftime format
///
/// A format without a day reads the first of the month, one without a month the
/// first month of the year (`"02/2020"` with `%m/%Y` is 2020-02-01).
fn parse_date(text: &str, input: &str) -> ParseResult<NaiveDate> {
    let mut parsed = Parsed::new();
    format::parse(&mut parsed, text, StrftimeItems::new(input))?;
    if parsed.ordinal().is_none() {
        if parsed.month().is_none() {
            parsed.set_month(1)?;
        }
        if parsed.day().is_none() {
            parsed.set_day(1)?;
        }
    }
    parsed.to_naive_date()
}
