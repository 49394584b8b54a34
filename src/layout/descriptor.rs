//! Compiled layout model
//!
//! These are the immutable products of the layout compiler. A [`GroupDescriptor`]
//! corresponds to one section of the layout file and owns the flat list of
//! [`FieldDescriptor`]s its geometric expansion produced.

use crate::layout::kind::FieldKind;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Axis-aligned rectangle in page coordinates, `x0 <= x1` and `y0 <= y1`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }
}

impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.x0, self.y0, self.x1, self.y1
        )
    }
}

/// One rectangle to read, with the kind its text is cast to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub bbox: BBox,
    pub kind: FieldKind,
    pub page: u32,
}

/// Geometric expansion selected by a section's `kind`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Single,
    Row,
    Table,
}

impl GroupKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "single" => Some(GroupKind::Single),
            "row" => Some(GroupKind::Row),
            "table" => Some(GroupKind::Table),
            _ => None,
        }
    }
}

/// Which axis decides a grid cell's kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Column,
    Row,
}

impl Priority {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "col" | "column" => Some(Priority::Column),
            "row" => Some(Priority::Row),
            _ => None,
        }
    }
}

static ROW_DICT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^row_dict\(\s*([\w.]+)\s*\)$").expect("static regex"));

/// Output shape selected by a section's `result`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResultShape {
    #[default]
    Text,
    List,
    Dict,
    RowDict { prefix: String },
    /// Anything else: fields pass through reduced to `{kind, load}`
    Passthrough(String),
}

impl ResultShape {
    /// Parse a `result` value. Only a malformed `row_dict(...)` is rejected.
    pub fn parse(value: &str) -> Result<Self, String> {
        let value = value.trim();
        match value {
            "text" => Ok(ResultShape::Text),
            "list" => Ok(ResultShape::List),
            "dict" => Ok(ResultShape::Dict),
            _ if value.starts_with("row_dict") => ROW_DICT
                .captures(value)
                .map(|caps| ResultShape::RowDict {
                    prefix: caps[1].to_string(),
                })
                .ok_or_else(|| format!("malformed row_dict selector '{}'", value)),
            other => Ok(ResultShape::Passthrough(other.to_string())),
        }
    }
}

impl fmt::Display for ResultShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultShape::Text => write!(f, "text"),
            ResultShape::List => write!(f, "list"),
            ResultShape::Dict => write!(f, "dict"),
            ResultShape::RowDict { prefix } => write!(f, "row_dict({})", prefix),
            ResultShape::Passthrough(raw) => write!(f, "{}", raw),
        }
    }
}

impl Serialize for ResultShape {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A `start-at` / `stop-at` condition: `<suffix>==<pattern>`
///
/// A field triggers when its name matches `<prefix>\..*\.<suffix>` and its
/// aggregated text matches `<pattern>`, both anchored at the start only.
#[derive(Debug, Clone)]
pub struct Trigger {
    pub suffix: String,
    pub pattern: String,
    name_re: Regex,
    value_re: Regex,
}

impl Trigger {
    pub fn parse(prefix: &str, spec: &str) -> Result<Self, String> {
        let (suffix, pattern) = spec
            .split_once("==")
            .ok_or_else(|| format!("expected '<suffix>==<pattern>', got '{}'", spec))?;
        let suffix = suffix.trim();
        let pattern = pattern.trim();
        if suffix.is_empty() {
            return Err(format!("empty field suffix in '{}'", spec));
        }

        let name_re = Regex::new(&format!(
            r"^{}\..*\.{}",
            regex::escape(prefix),
            regex::escape(suffix)
        ))
        .map_err(|e| e.to_string())?;
        let value_re = Regex::new(&format!("^(?:{})", pattern))
            .map_err(|e| format!("invalid pattern '{}': {}", pattern, e))?;

        Ok(Self {
            suffix: suffix.to_string(),
            pattern: pattern.to_string(),
            name_re,
            value_re,
        })
    }

    pub fn fires(&self, field_name: &str, text: &str) -> bool {
        self.name_re.is_match(field_name) && self.value_re.is_match(text)
    }
}

impl PartialEq for Trigger {
    fn eq(&self, other: &Self) -> bool {
        self.suffix == other.suffix
            && self.pattern == other.pattern
            && self.name_re.as_str() == other.name_re.as_str()
    }
}

impl Serialize for Trigger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&format_args!("{}=={}", self.suffix, self.pattern))
    }
}

/// One compiled layout section
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupDescriptor {
    pub section: String,
    pub kind: GroupKind,
    pub group: Option<String>,
    pub page: u32,
    pub region: BBox,
    pub result: ResultShape,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<Trigger>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_at: Option<Trigger>,
    pub fields: Vec<FieldDescriptor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_shape_parse() {
        assert_eq!(ResultShape::parse("text").unwrap(), ResultShape::Text);
        assert_eq!(ResultShape::parse(" list ").unwrap(), ResultShape::List);
        assert_eq!(
            ResultShape::parse("row_dict( Items.x )").unwrap(),
            ResultShape::RowDict {
                prefix: "Items.x".into()
            }
        );
        assert_eq!(
            ResultShape::parse("fields").unwrap(),
            ResultShape::Passthrough("fields".into())
        );
        assert!(ResultShape::parse("row_dict(").is_err());
    }

    #[test]
    fn test_trigger_matches_name_and_value() {
        let trigger = Trigger::parse("Items", "Code == STOP").unwrap();
        assert!(trigger.fires("Items.R01.Code", "STOP here"));
        assert!(!trigger.fires("Items.R01.Code", "NOT STOP"));
        assert!(!trigger.fires("Other.R01.Code", "STOP"));
        assert!(!trigger.fires("Items.Code", "STOP"));
    }

    #[test]
    fn test_trigger_rejects_malformed() {
        assert!(Trigger::parse("Items", "Code").is_err());
        assert!(Trigger::parse("Items", "==x").is_err());
        assert!(Trigger::parse("Items", "Code==(").is_err());
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!(Priority::parse("col"), Some(Priority::Column));
        assert_eq!(Priority::parse("row"), Some(Priority::Row));
        assert_eq!(Priority::parse("diag"), None);
    }
}
