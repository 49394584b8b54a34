//! Scalar field kinds
//!
//! Grammar: `str | int | float | bool | date [<format>]`
//! The date format may be written either after a space (`date %d-%m-%Y`) or in
//! brackets (`date[%d-%m-%Y]`). Without one the configured default applies.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Type tag governing how aggregated text is cast
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldKind {
    #[default]
    Str,
    Int,
    Float,
    Bool,
    Date { format: Option<String> },
}

impl FieldKind {
    pub fn date(format: &str) -> Self {
        FieldKind::Date {
            format: Some(format.to_string()),
        }
    }
}

impl FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "str" => return Ok(FieldKind::Str),
            "int" => return Ok(FieldKind::Int),
            "float" => return Ok(FieldKind::Float),
            "bool" => return Ok(FieldKind::Bool),
            "date" => return Ok(FieldKind::Date { format: None }),
            _ => {}
        }

        let Some(rest) = s.strip_prefix("date") else {
            return Err(format!("unknown field kind '{}'", s));
        };

        let format = if let Some(bracketed) = rest.strip_prefix('[') {
            bracketed
                .strip_suffix(']')
                .ok_or_else(|| format!("unterminated date format in '{}'", s))?
        } else if rest.starts_with(char::is_whitespace) {
            rest
        } else {
            return Err(format!("unknown field kind '{}'", s));
        };

        let format = format.trim();
        if format.is_empty() {
            Ok(FieldKind::Date { format: None })
        } else {
            Ok(FieldKind::date(format))
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Str => write!(f, "str"),
            FieldKind::Int => write!(f, "int"),
            FieldKind::Float => write!(f, "float"),
            FieldKind::Bool => write!(f, "bool"),
            FieldKind::Date { format: None } => write!(f, "date"),
            FieldKind::Date {
                format: Some(format),
            } => write!(f, "date {}", format),
        }
    }
}

impl Serialize for FieldKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
