//! Re-filing: flattening all records of a document into one keyed map
//!
//! Keys by record kind, `n` being the record's position in the record list:
//!
//! - `rowdict`: every row is exploded to `SCR.<code>.<field>`, where `<code>` is the
//!   value of the row's key field, or `RD<nnnn>.<row>` when the row has none
//! - `dict`: entries are merged as they are
//! - `text`: `TXT.<text>`
//! - anything else: the record's name, or `KEY-<n>` for unnamed records
//!
//! Colliding keys overwrite silently, last write wins.

use super::{Record, RecordKind, ShapedLoad};
use indexmap::IndexMap;

pub type Refiled = IndexMap<String, ShapedLoad>;

pub fn refile(records: &[Record], key_field: &str) -> Refiled {
    let mut keystore = Refiled::new();
    for (num, record) in records.iter().enumerate() {
        match (&record.kind, &record.load) {
            (RecordKind::RowDict, ShapedLoad::RowDict(rows)) => {
                for (row_key, row) in rows {
                    let code = match row.get(key_field) {
                        Some(code) => code.to_string(),
                        None => format!("RD{:04}.{}", num, row_key),
                    };
                    for (field, value) in row {
                        keystore.insert(format!("SCR.{}.{}", code, field), value.clone().into());
                    }
                }
            }
            (RecordKind::Dict, ShapedLoad::Dict(map)) => {
                for (key, value) in map {
                    keystore.insert(key.clone(), value.clone().into());
                }
            }
            (RecordKind::Text, load) => {
                keystore.insert(format!("TXT.{}", load), load.clone());
            }
            (_, load) => {
                let key = match &record.name {
                    Some(name) => name.clone(),
                    None => format!("KEY-{}", num),
                };
                keystore.insert(key, load.clone());
            }
        }
    }
    keystore
}
