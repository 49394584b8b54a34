//! Structured diagnostics
//!
//! The compiler, matcher and shaper never log on their own. Anything worth telling
//! the operator is pushed into a [`Diagnostics`] collector and handed back to the
//! caller, which decides how to surface it (the CLI replays them through `tracing`).

use serde::Serialize;
use std::fmt;

/// How bad a diagnostic is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// Machine-readable category of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Code {
    /// A required section key is absent
    MissingKey,
    /// An optional but expected key (`group`, `result`) is absent
    MissingOptional,
    /// A key is present but its value cannot be used
    InvalidValue,
    /// The section carries a key nobody reads
    UnknownKey,
    /// A `rows`/`columns` grammar failed to parse
    RangeSyntax,
    /// One range token expanded to nothing (inverted or malformed dash range)
    RangeExpansion,
    /// A colon-form pivot fell outside the remaining axis span
    PivotClamped,
    /// Aggregated text could not be coerced to the field's kind
    FieldCast,
    /// Shaping a group failed, its fields are passed through unshaped
    GroupProcessing,
}

impl Code {
    pub fn as_str(&self) -> &'static str {
        match self {
            Code::MissingKey => "missing-key",
            Code::MissingOptional => "missing-optional",
            Code::InvalidValue => "invalid-value",
            Code::UnknownKey => "unknown-key",
            Code::RangeSyntax => "range-syntax",
            Code::RangeExpansion => "range-expansion",
            Code::PivotClamped => "pivot-clamped",
            Code::FieldCast => "field-cast",
            Code::GroupProcessing => "group-processing",
        }
    }
}

/// One reported problem, attached to the section, group or field it concerns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Code,
    pub scope: String,
    pub message: String,
}

impl Diagnostic {
    pub fn error(code: Code, scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            scope: scope.into(),
            message: message.into(),
        }
    }

    pub fn warning(code: Code, scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            scope: scope.into(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Replay this diagnostic through `tracing` at the matching level
    pub fn log(&self) {
        match self.severity {
            Severity::Warning => tracing::warn!(code = self.code.as_str(), "{}", self),
            Severity::Error => tracing::error!(code = self.code.as_str(), "{}", self),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(
            f,
            "{}[{}] {}: {}",
            level,
            self.code.as_str(),
            self.scope,
            self.message
        )
    }
}

/// Ordered collection of diagnostics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn error(&mut self, code: Code, scope: impl Into<String>, message: impl Into<String>) {
        self.push(Diagnostic::error(code, scope, message));
    }

    pub fn warn(&mut self, code: Code, scope: impl Into<String>, message: impl Into<String>) {
        self.push(Diagnostic::warning(code, scope, message));
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = Diagnostic>) {
        self.items.extend(other);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_error()).count()
    }

    /// Diagnostics carrying the given code
    pub fn with_code(&self, code: Code) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(move |d| d.code == code)
    }

    pub fn log_all(&self) {
        for diagnostic in &self.items {
            diagnostic.log();
        }
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<T: IntoIterator<Item = Diagnostic>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.items.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}
