//! Layout file reader
//!
//! Layout files are INI-style: `[section]` headers followed by `key = value` (or
//! `key: value`) lines. The reader is line based:
//!
//! - keys are lower-cased, keys and values are trimmed
//! - the first `=` or `:` on a line separates key from value
//! - lines starting with `#` or `;` are comments
//! - indented lines continue the previous value, joined with a newline
//! - keys of a `[DEFAULT]` section are inherited by every other section
//!
//! Section order is preserved; it is the tie-break for groups sharing a position.

use crate::error::LayoutError;
use indexmap::IndexMap;
use std::fs;
use std::path::Path;

pub const DEFAULT_SECTION: &str = "DEFAULT";

/// One `[section]` and its raw string entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub entries: IndexMap<String, String>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: IndexMap::new(),
        }
    }

    /// Builder-style entry insertion, handy for constructing sections in code
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_lowercase(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

/// Parsed layout file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutSource {
    pub sections: Vec<Section>,
}

impl LayoutSource {
    pub fn from_sections(sections: Vec<Section>) -> Self {
        Self { sections }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LayoutError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| LayoutError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, LayoutError> {
        let mut defaults: IndexMap<String, String> = IndexMap::new();
        let mut sections: Vec<Section> = Vec::new();
        // Index into `sections`, or None while inside [DEFAULT]
        let mut current: Option<Option<usize>> = None;
        let mut last_key: Option<String> = None;

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim_end_matches('\r');
            let trimmed = line.trim();

            if trimmed.is_empty() {
                last_key = None;
                continue;
            }
            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            let indented = line.starts_with(|c: char| c.is_whitespace());
            if indented {
                if let (Some(target), Some(key)) = (current, last_key.as_ref()) {
                    let entries = match target {
                        Some(i) => &mut sections[i].entries,
                        None => &mut defaults,
                    };
                    if let Some(value) = entries.get_mut(key) {
                        if !value.is_empty() {
                            value.push('\n');
                        }
                        value.push_str(trimmed);
                    }
                    continue;
                }
            }

            if let Some(header) = trimmed.strip_prefix('[') {
                let name = header
                    .strip_suffix(']')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| {
                        syntax(line_no, format!("malformed section header '{}'", trimmed))
                    })?;

                last_key = None;
                if name == DEFAULT_SECTION {
                    current = Some(None);
                    continue;
                }
                if sections.iter().any(|s| s.name == name) {
                    return Err(syntax(line_no, format!("duplicate section '{}'", name)));
                }
                sections.push(Section {
                    name: name.to_string(),
                    entries: IndexMap::new(),
                });
                current = Some(Some(sections.len() - 1));
                continue;
            }

            let target = current
                .ok_or_else(|| syntax(line_no, "entry before the first section header"))?;
            let split = trimmed
                .find(|c: char| c == '=' || c == ':')
                .ok_or_else(|| {
                    syntax(line_no, format!("expected 'key = value', got '{}'", trimmed))
                })?;
            let key = trimmed[..split].trim().to_lowercase();
            let value = trimmed[split + 1..].trim().to_string();
            if key.is_empty() {
                return Err(syntax(line_no, "empty key"));
            }

            let entries = match target {
                Some(i) => &mut sections[i].entries,
                None => &mut defaults,
            };
            if entries.contains_key(&key) {
                return Err(syntax(line_no, format!("duplicate key '{}'", key)));
            }
            entries.insert(key.clone(), value);
            last_key = Some(key);
        }

        for section in &mut sections {
            for (key, value) in &defaults {
                section
                    .entries
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }
        }

        Ok(Self { sections })
    }
}

fn syntax(line: usize, message: impl Into<String>) -> LayoutError {
    LayoutError::Syntax {
        line,
        message: message.into(),
    }
}
