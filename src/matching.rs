//! Field matcher
//!
//! Assigns extracted fragments to compiled field rectangles, casts the aggregated
//! text and runs each group's start/stop activation protocol. See [`matcher`] for
//! the geometry and [`cast`] for the coercion rules.

pub mod cast;
pub mod matcher;

pub use cast::{cast, move_sign};
pub use matcher::{Activation, MatchedField, MatchedGroup, Matcher};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A cast field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Load {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Load {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Load::Bool(value) => write!(f, "{}", value),
            Load::Int(value) => write!(f, "{}", value),
            Load::Float(value) => write!(f, "{}", value),
            Load::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for Load {
    fn from(value: &str) -> Self {
        Load::Text(value.to_string())
    }
}

impl From<String> for Load {
    fn from(value: String) -> Self {
        Load::Text(value)
    }
}

impl From<i64> for Load {
    fn from(value: i64) -> Self {
        Load::Int(value)
    }
}

impl From<f64> for Load {
    fn from(value: f64) -> Self {
        Load::Float(value)
    }
}

impl From<bool> for Load {
    fn from(value: bool) -> Self {
        Load::Bool(value)
    }
}
