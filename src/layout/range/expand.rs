//! Axis expansion: turning a parsed range into contiguous [`RangeToken`]s
//!
//! Invariant: the tokens returned for one axis start at the axis start, end at the
//! axis end exactly, and each token starts where the previous one ended.

use super::parser::{Form, Label, RangeSpec};
use crate::diagnostics::{Code, Diagnostics};
use crate::layout::kind::FieldKind;
use serde::Serialize;

/// Upper bound on labels a single dash range may produce
pub const MAX_SPAN_LABELS: u64 = 10_000;

/// One resolved segment of a row or column axis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeToken {
    pub label: String,
    pub kind: Option<FieldKind>,
    pub start: f64,
    pub end: f64,
}

/// Expand a label into the concrete labels it stands for
///
/// `A01-03` becomes `A01, A02, A03`: the trailing digit run of the base is the start
/// value and its width is the zero-padding width. Numbers that outgrow the width are
/// printed in full (`A08-11` gives `A08, A09, A10, A11`).
pub fn expand_label(label: &Label) -> Result<Vec<String>, String> {
    let (base, end) = match label {
        Label::Plain(label) => return Ok(vec![label.clone()]),
        Label::Span { base, end } => (base, end),
    };

    let prefix = base.trim_end_matches(|c: char| c.is_ascii_digit());
    let start_digits = &base[prefix.len()..];
    if start_digits.is_empty() {
        return Err(format!("range '{}-{}' has no numeric start", base, end));
    }
    if end.is_empty() || !end.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("range '{}-{}' has no numeric end", base, end));
    }

    let start: u64 = start_digits
        .parse()
        .map_err(|_| format!("range start '{}' is too large", start_digits))?;
    let stop: u64 = end
        .parse()
        .map_err(|_| format!("range end '{}' is too large", end))?;
    if stop < start {
        return Err(format!("inverted range {}<{}", stop, start));
    }
    if stop - start >= MAX_SPAN_LABELS {
        return Err(format!(
            "range '{}-{}' would produce more than {} labels",
            base, end, MAX_SPAN_LABELS
        ));
    }

    let width = start_digits.len();
    Ok((start..=stop)
        .map(|n| format!("{}{:0width$}", prefix, n, width = width))
        .collect())
}

/// Evenly spaced boundaries `start = b0 < b1 < ... < bn = end`
fn boundaries(start: f64, end: f64, n: usize) -> Vec<f64> {
    (0..=n)
        .map(|i| {
            if i == n {
                end
            } else {
                start + (end - start) * i as f64 / n as f64
            }
        })
        .collect()
}

fn subdivide(
    labels: Vec<String>,
    kind: &Option<FieldKind>,
    start: f64,
    end: f64,
    out: &mut Vec<RangeToken>,
) {
    let edges = boundaries(start, end, labels.len());
    for (i, label) in labels.into_iter().enumerate() {
        out.push(RangeToken {
            label,
            kind: kind.clone(),
            start: edges[i],
            end: edges[i + 1],
        });
    }
}

/// Lay a parsed range over the axis `[start, end]`
///
/// Malformed dash ranges and out-of-span pivots are recoverable: they are reported to
/// `diags` under `scope` and the expansion carries on without them.
pub fn expand_axis(
    spec: &RangeSpec,
    start: f64,
    end: f64,
    scope: &str,
    diags: &mut Diagnostics,
) -> Vec<RangeToken> {
    let mut expanded: Vec<(Vec<String>, &Option<FieldKind>, Option<f64>)> = Vec::new();
    for item in &spec.items {
        let labels = match expand_label(&item.label) {
            Ok(labels) => labels,
            Err(message) => {
                diags.error(Code::RangeExpansion, scope, message);
                Vec::new()
            }
        };
        expanded.push((labels, &item.kind, item.pivot));
    }

    let mut tokens = Vec::new();
    match spec.form {
        Form::Single | Form::Comma => {
            let flat: Vec<(String, &Option<FieldKind>)> = expanded
                .into_iter()
                .flat_map(|(labels, kind, _)| labels.into_iter().map(move |l| (l, kind)))
                .collect();
            let edges = boundaries(start, end, flat.len());
            for (i, (label, kind)) in flat.into_iter().enumerate() {
                tokens.push(RangeToken {
                    label,
                    kind: kind.clone(),
                    start: edges[i],
                    end: edges[i + 1],
                });
            }
        }
        Form::Colon => {
            let mut cursor = start;
            for (labels, kind, pivot) in expanded {
                let segment_end = match pivot {
                    None => end,
                    Some(p) if p < cursor || p > end => {
                        let clamped = p.clamp(cursor, end);
                        diags.warn(
                            Code::PivotClamped,
                            scope,
                            format!("pivot {} outside [{}, {}], using {}", p, cursor, end, clamped),
                        );
                        clamped
                    }
                    Some(p) => p,
                };
                subdivide(labels, kind, cursor, segment_end, &mut tokens);
                cursor = segment_end;
            }
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::range::parser::parse_range;
    use rstest::rstest;

    fn span(base: &str, end: &str) -> Label {
        Label::Span {
            base: base.into(),
            end: end.into(),
        }
    }

    #[rstest]
    #[case("A01", "03", &["A01", "A02", "A03"])]
    #[case("A08", "11", &["A08", "A09", "A10", "A11"])]
    #[case("A9", "11", &["A9", "A10", "A11"])]
    #[case("row2", "5", &["row2", "row3", "row4", "row5"])]
    #[case("R.7", "7", &["R.7"])]
    #[case("N°01", "03", &["N°01", "N°02", "N°03"])]
    #[case("Qtà1", "2", &["Qtà1", "Qtà2"])]
    fn test_expand_label(#[case] base: &str, #[case] end: &str, #[case] expected: &[&str]) {
        assert_eq!(expand_label(&span(base, end)).unwrap(), expected);
    }

    #[rstest]
    #[case("A05", "02")]
    #[case("Cod", "Art")]
    #[case("A1", "x2")]
    #[case("A1", "99999")]
    fn test_expand_label_rejects(#[case] base: &str, #[case] end: &str) {
        assert!(expand_label(&span(base, end)).is_err());
    }

    #[test]
    fn test_inverted_range_is_recoverable() {
        let spec = parse_range("A05-02, B").unwrap();
        let mut diags = Diagnostics::new();
        let tokens = expand_axis(&spec, 0.0, 100.0, "columns", &mut diags);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].label, "B");
        assert_eq!((tokens[0].start, tokens[0].end), (0.0, 100.0));
        assert_eq!(diags.with_code(Code::RangeExpansion).count(), 1);
    }

    #[test]
    fn test_comma_form_is_equal_width() {
        let spec = parse_range("A,B,C,D").unwrap();
        let mut diags = Diagnostics::new();
        let tokens = expand_axis(&spec, 0.0, 100.0, "columns", &mut diags);
        let spans: Vec<_> = tokens.iter().map(|t| (t.start, t.end)).collect();
        assert_eq!(
            spans,
            vec![(0.0, 25.0), (25.0, 50.0), (50.0, 75.0), (75.0, 100.0)]
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn test_colon_form_subdivides_dash_ranges() {
        let spec = parse_range("Code :40: Q1-2(int) :80: Note").unwrap();
        let mut diags = Diagnostics::new();
        let tokens = expand_axis(&spec, 10.0, 100.0, "columns", &mut diags);
        let spans: Vec<_> = tokens
            .iter()
            .map(|t| (t.label.as_str(), t.start, t.end))
            .collect();
        assert_eq!(
            spans,
            vec![
                ("Code", 10.0, 40.0),
                ("Q1", 40.0, 60.0),
                ("Q2", 60.0, 80.0),
                ("Note", 80.0, 100.0),
            ]
        );
        assert_eq!(tokens[1].kind, Some(FieldKind::Int));
        assert_eq!(tokens[3].kind, None);
    }

    #[test]
    fn test_pivot_outside_axis_is_clamped() {
        let spec = parse_range("A :500: B").unwrap();
        let mut diags = Diagnostics::new();
        let tokens = expand_axis(&spec, 0.0, 100.0, "columns", &mut diags);
        assert_eq!((tokens[0].start, tokens[0].end), (0.0, 100.0));
        assert_eq!((tokens[1].start, tokens[1].end), (100.0, 100.0));
        assert_eq!(diags.with_code(Code::PivotClamped).count(), 1);
    }
}
