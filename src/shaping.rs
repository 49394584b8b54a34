//! Result shaper
//!
//! Each group's retained fields are regrouped into output [`Record`]s according to
//! the group's `result` selector ([`shape`]), and the records of a whole document
//! can then be flattened into one keyed map ([`refile`]).

pub mod refile;
pub mod shape;

pub use refile::{refile, Refiled};
pub use shape::{shape_group, shape_row_dict};

use crate::layout::{BBox, FieldKind};
use crate::matching::{Load, MatchedField};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::fmt;

/// Field name to value
pub type LoadMap = IndexMap<String, Load>;

/// Row key to `{rest: value}`
pub type RowMap = IndexMap<String, LoadMap>;

/// Value carried by a record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ShapedLoad {
    Scalar(Load),
    List(Vec<Load>),
    Dict(LoadMap),
    RowDict(RowMap),
}

impl From<Load> for ShapedLoad {
    fn from(load: Load) -> Self {
        ShapedLoad::Scalar(load)
    }
}

impl fmt::Display for ShapedLoad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapedLoad::Scalar(load) => write!(f, "{}", load),
            other => match serde_json::to_string(other) {
                Ok(json) => f.write_str(&json),
                Err(_) => Err(fmt::Error),
            },
        }
    }
}

/// What a record holds: a single field's kind, or one of the shaped pseudo-kinds
#[derive(Debug, Clone, PartialEq)]
pub enum RecordKind {
    Field(FieldKind),
    Text,
    List,
    Dict,
    RowDict,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Field(kind) => write!(f, "{}", kind),
            RecordKind::Text => f.write_str("text"),
            RecordKind::List => f.write_str("list"),
            RecordKind::Dict => f.write_str("dict"),
            RecordKind::RowDict => f.write_str("rowdict"),
        }
    }
}

impl Serialize for RecordKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One output entry
///
/// Unshaped fields carry their name, box and page. Shaped pseudo-fields and
/// pass-through fields are reduced to `{kind, load}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kind: RecordKind,
    pub load: ShapedLoad,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl Record {
    /// A pseudo-field produced by a shape
    pub fn shaped(kind: RecordKind, load: ShapedLoad) -> Self {
        Self {
            name: None,
            kind,
            load,
            bbox: None,
            page: None,
        }
    }

    /// A named scalar, as found in an already flat result
    pub fn named(name: impl Into<String>, kind: FieldKind, load: Load) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::shaped(RecordKind::Field(kind), load.into())
        }
    }

    /// A matched field with everything it knows
    pub fn from_field(field: &MatchedField<'_>) -> Self {
        Self {
            name: Some(field.descriptor.name.clone()),
            kind: RecordKind::Field(field.descriptor.kind.clone()),
            load: field.load.clone().into(),
            bbox: Some(field.descriptor.bbox),
            page: Some(field.descriptor.page),
        }
    }

    /// A matched field reduced to `{kind, load}`
    pub fn reduced(field: &MatchedField<'_>) -> Self {
        Self::shaped(
            RecordKind::Field(field.descriptor.kind.clone()),
            field.load.clone().into(),
        )
    }
}
