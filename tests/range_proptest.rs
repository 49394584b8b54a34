//! Property-based tests for range grammar expansion
//!
//! Whatever the grammar, the tokens of one axis must partition it:
//! - the first token starts at the axis start
//! - the last token ends at the axis end exactly
//! - each token starts where the previous one ended
//!
//! Comma form adds equal widths, colon form adds "a token ends at its pivot".

use formread::diagnostics::Diagnostics;
use formread::layout::range::{expand_axis, expand_label, parse_range, Label, RangeToken};
use proptest::prelude::*;

/// Plain labels, no dash shorthand
fn label_strategy() -> impl Strategy<Value = String> {
    prop_oneof!["[A-Z][a-z]{0,6}", "[A-Z]{1,3}[0-9]{1,2}", "[a-z]+\\.[a-z]+",]
}

fn axis_strategy() -> impl Strategy<Value = (f64, f64)> {
    (0.0f64..800.0, 1.0f64..800.0).prop_map(|(start, width)| (start, start + width))
}

fn assert_partition(tokens: &[RangeToken], start: f64, end: f64) -> Result<(), TestCaseError> {
    prop_assert!(!tokens.is_empty());
    prop_assert_eq!(tokens[0].start, start);
    prop_assert_eq!(tokens[tokens.len() - 1].end, end);
    for pair in tokens.windows(2) {
        prop_assert_eq!(pair[0].end, pair[1].start);
    }
    for token in tokens {
        prop_assert!(token.start <= token.end);
    }
    Ok(())
}

#[cfg(test)]
mod proptest_tests {
    use super::*;

    proptest! {
        #[test]
        fn comma_form_is_an_equal_partition(
            labels in prop::collection::vec(label_strategy(), 1..12),
            (start, end) in axis_strategy(),
        ) {
            let grammar = labels.join(",");
            let spec = parse_range(&grammar).unwrap();
            let mut diags = Diagnostics::new();
            let tokens = expand_axis(&spec, start, end, "columns", &mut diags);

            prop_assert!(diags.is_empty());
            prop_assert_eq!(tokens.len(), labels.len());
            assert_partition(&tokens, start, end)?;

            let expected = (end - start) / labels.len() as f64;
            for (token, label) in tokens.iter().zip(&labels) {
                prop_assert_eq!(&token.label, label);
                prop_assert!(((token.end - token.start) - expected).abs() < 1e-9 * end.max(1.0));
            }
        }

        #[test]
        fn colon_form_ends_at_pivots(
            labels in prop::collection::vec(label_strategy(), 2..8),
            cuts in prop::collection::vec(0.0f64..1.0, 7),
            (start, end) in axis_strategy(),
        ) {
            let mut fractions: Vec<f64> = cuts[..labels.len() - 1].to_vec();
            fractions.sort_by(f64::total_cmp);
            let pivots: Vec<f64> = fractions.iter().map(|f| start + f * (end - start)).collect();

            let mut grammar = labels[0].clone();
            for (label, pivot) in labels[1..].iter().zip(&pivots) {
                grammar.push_str(&format!(" :{}: {}", pivot, label));
            }

            let spec = parse_range(&grammar).unwrap();
            let mut diags = Diagnostics::new();
            let tokens = expand_axis(&spec, start, end, "rows", &mut diags);

            prop_assert!(diags.is_empty(), "{}", diags);
            prop_assert_eq!(tokens.len(), labels.len());
            assert_partition(&tokens, start, end)?;
            for (token, pivot) in tokens.iter().zip(&pivots) {
                prop_assert_eq!(token.end, *pivot);
            }
        }

        #[test]
        fn dash_ranges_subdivide_their_segment(
            prefix in "[A-Z]{1,3}",
            first in 0u64..200,
            count in 0u64..30,
            (start, end) in axis_strategy(),
        ) {
            let pivot = (start + end) / 2.0;
            let grammar = format!("Code :{}: {}{:02}-{}", pivot, prefix, first, first + count);
            let spec = parse_range(&grammar).unwrap();
            let mut diags = Diagnostics::new();
            let tokens = expand_axis(&spec, start, end, "columns", &mut diags);

            prop_assert!(diags.is_empty());
            prop_assert_eq!(tokens.len() as u64, count + 2);
            assert_partition(&tokens, start, end)?;
            prop_assert!(tokens[1..].iter().all(|t| t.label.starts_with(&prefix)));
        }

        #[test]
        fn inverted_dash_ranges_expand_to_nothing(
            prefix in "[A-Z]{1,3}",
            stop in 0u64..100,
            gap in 1u64..100,
        ) {
            let label = Label::Span {
                base: format!("{}{}", prefix, stop + gap),
                end: stop.to_string(),
            };
            prop_assert!(expand_label(&label).is_err());
        }
    }
}
