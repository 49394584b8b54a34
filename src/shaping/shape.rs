//! Group shapes
//!
//! | `result`         | output                                              |
//! |------------------|-----------------------------------------------------|
//! | `text` (default) | one `text` record, loads joined with newlines       |
//! | `list`           | one `list` record, loads in order                   |
//! | `dict`           | one `dict` record, full field name to load          |
//! | `row_dict(P)`    | one `rowdict` record, `row -> {rest: load}` under P |
//! | anything else    | every field reduced to `{kind, load}`               |
//!
//! A group with no retained fields produces no records at all.

use super::{LoadMap, Record, RecordKind, RowMap, ShapedLoad};
use crate::diagnostics::{Code, Diagnostics};
use crate::layout::ResultShape;
use crate::matching::{Load, MatchedField, MatchedGroup};

pub fn shape_group(matched: &MatchedGroup<'_>, diags: &mut Diagnostics) -> Vec<Record> {
    let fields = &matched.fields;
    if fields.is_empty() {
        return Vec::new();
    }

    match &matched.group.result {
        ResultShape::Text => {
            let text = fields
                .iter()
                .map(|f| f.load.to_string())
                .collect::<Vec<_>>()
                .join("\n");
            vec![Record::shaped(RecordKind::Text, Load::Text(text).into())]
        }
        ResultShape::List => {
            let loads = fields.iter().map(|f| f.load.clone()).collect();
            vec![Record::shaped(RecordKind::List, ShapedLoad::List(loads))]
        }
        ResultShape::Dict => {
            let map: LoadMap = fields
                .iter()
                .map(|f| (f.descriptor.name.clone(), f.load.clone()))
                .collect();
            vec![Record::shaped(RecordKind::Dict, ShapedLoad::Dict(map))]
        }
        ResultShape::RowDict { prefix } => match shape_row_dict(fields, prefix) {
            Ok(rows) => vec![Record::shaped(RecordKind::RowDict, ShapedLoad::RowDict(rows))],
            Err(message) => {
                diags.error(
                    Code::GroupProcessing,
                    format!("group '{}'", matched.group.section),
                    format!("{}, fields kept unshaped", message),
                );
                fields.iter().map(Record::from_field).collect()
            }
        },
        ResultShape::Passthrough(_) => fields.iter().map(Record::reduced).collect(),
    }
}

/// Build `row -> {rest: load}` from the fields named `<prefix>.<row>.<rest>`
///
/// Fields outside `prefix` are ignored. A field under `prefix` without a row key
/// fails the whole group.
pub fn shape_row_dict(fields: &[MatchedField<'_>], prefix: &str) -> Result<RowMap, String> {
    let mut rows = RowMap::new();
    for field in fields {
        let name = &field.descriptor.name;
        let Some(tail) = name
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('.'))
        else {
            tracing::debug!(field = %name, prefix, "outside row_dict prefix");
            continue;
        };
        let (row, rest) = tail
            .split_once('.')
            .ok_or_else(|| format!("field '{}' has no row key under '{}'", name, prefix))?;
        rows.entry(row.to_string())
            .or_default()
            .insert(rest.to_string(), field.load.clone());
    }
    Ok(rows)
}
