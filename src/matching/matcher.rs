//! Aggregation and activation
//!
//! A fragment belongs to a field when, on the field's page, its left edge lies in
//! `[x0, x1]` and its top edge lies in the band `[y0 - a*h, y0 + b*h]`, with `h` the
//! field height and `a`, `b` the configured tolerance factors (0.1 and 0.75 by
//! default). The band is anchored on the top of the box: fragments are expected to
//! start near the top of the rectangle declared for them.
//!
//! Groups are scanned field by field in compiled order:
//!
//! ```text
//!             start-at fires            stop-at fires
//!  INACTIVE ------------------> ACTIVE ---------------> STOPPED
//!  (only with start-at)        (initial otherwise)
//! ```
//!
//! Triggers are only evaluated on fields with non-empty text. The start check runs
//! before the stop check, so the field that starts a group is kept while the field
//! that stops it is not.

use super::cast::cast;
use super::Load;
use crate::diagnostics::{Code, Diagnostics};
use crate::extraction::Fragment;
use crate::layout::{FieldDescriptor, GroupDescriptor, Layout};
use crate::settings::{CastingSettings, MatchingSettings, Settings};

/// Activation state of a group while its fields are scanned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Inactive,
    Active,
    Stopped,
}

/// A field that received text, with its cast value
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedField<'a> {
    pub descriptor: &'a FieldDescriptor,
    /// Aggregated text, before sign handling and casting
    pub text: String,
    pub load: Load,
}

/// The retained fields of one group
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedGroup<'a> {
    pub group: &'a GroupDescriptor,
    pub fields: Vec<MatchedField<'a>>,
    pub state: Activation,
}

pub struct Matcher<'s> {
    matching: &'s MatchingSettings,
    casting: &'s CastingSettings,
}

impl<'s> Matcher<'s> {
    pub fn new(settings: &'s Settings) -> Self {
        Self {
            matching: &settings.matching,
            casting: &settings.casting,
        }
    }

    /// Concatenate, in order, the text of every fragment falling in `field`
    ///
    /// `fragments` must be sorted by `(page, y0, x0)`.
    pub fn aggregate(&self, field: &FieldDescriptor, fragments: &[Fragment]) -> String {
        let bbox = &field.bbox;
        let h = bbox.height();
        let top = bbox.y0 - self.matching.band_above * h;
        let bottom = bbox.y0 + self.matching.band_below * h;

        let mut text = String::new();
        for fragment in page_slice(fragments, field.page) {
            let f = &fragment.bbox;
            if bbox.x0 <= f.x0 && f.x0 <= bbox.x1 && top <= f.y0 && f.y0 <= bottom {
                text.push(' ');
                text.push_str(&fragment.text);
                text = text.trim().to_string();
            }
        }
        text
    }

    /// Match one group, running its activation protocol
    pub fn match_group<'a>(
        &self,
        group: &'a GroupDescriptor,
        fragments: &[Fragment],
        diags: &mut Diagnostics,
    ) -> MatchedGroup<'a> {
        let mut state = if group.start_at.is_some() {
            Activation::Inactive
        } else {
            Activation::Active
        };
        let mut fields = Vec::new();

        for field in &group.fields {
            let text = self.aggregate(field, fragments);
            tracing::trace!(
                field = %field.name,
                page = field.page,
                bbox = %field.bbox,
                text = %text,
                "aggregated"
            );
            if text.is_empty() {
                continue;
            }

            if let Some(start) = &group.start_at {
                if state == Activation::Inactive && start.fires(&field.name, &text) {
                    tracing::debug!(group = %group.section, field = %field.name, "start-at fired");
                    state = Activation::Active;
                }
            }
            if let Some(stop) = &group.stop_at {
                if stop.fires(&field.name, &text) {
                    tracing::debug!(group = %group.section, field = %field.name, "stop-at fired");
                    state = Activation::Stopped;
                    break;
                }
            }
            if state != Activation::Active {
                continue;
            }

            let load = match cast(&text, &field.kind, self.casting) {
                Ok(load) => load,
                Err(reason) => {
                    diags.error(
                        Code::FieldCast,
                        format!("field '{}'", field.name),
                        format!("cannot cast to {}: {}", field.kind, reason),
                    );
                    Load::Text(text.clone())
                }
            };
            fields.push(MatchedField {
                descriptor: field,
                text,
                load,
            });
        }

        MatchedGroup {
            group,
            fields,
            state,
        }
    }

    /// Match every group of a layout, in processing order
    pub fn match_layout<'a>(
        &self,
        layout: &'a Layout,
        fragments: &[Fragment],
        diags: &mut Diagnostics,
    ) -> Vec<MatchedGroup<'a>> {
        layout
            .groups
            .iter()
            .map(|group| self.match_group(group, fragments, diags))
            .collect()
    }
}

/// The contiguous run of fragments on `page`
fn page_slice(fragments: &[Fragment], page: u32) -> &[Fragment] {
    let start = fragments.partition_point(|f| f.page < page);
    let end = fragments.partition_point(|f| f.page <= page);
    &fragments[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{BBox, FieldKind, GroupKind, ResultShape, Trigger};

    fn fragment(page: u32, x0: f64, y0: f64, text: &str) -> Fragment {
        Fragment::new(page, BBox::new(x0, y0, x0 + 20.0, y0 + 8.0), text)
    }

    fn field(name: &str, y0: f64, kind: FieldKind) -> FieldDescriptor {
        FieldDescriptor {
            name: name.to_string(),
            bbox: BBox::new(0.0, y0, 100.0, y0 + 10.0),
            kind,
            page: 1,
        }
    }

    fn rows_group(
        codes: &[&str],
        start_at: Option<&str>,
        stop_at: Option<&str>,
    ) -> (GroupDescriptor, Vec<Fragment>) {
        let mut fields = Vec::new();
        let mut fragments = Vec::new();
        for (i, code) in codes.iter().enumerate() {
            let y0 = 100.0 + 10.0 * i as f64;
            fields.push(field(&format!("Items.R{}.Code", i + 1), y0, FieldKind::Str));
            fragments.push(fragment(1, 5.0, y0, code));
        }
        let group = GroupDescriptor {
            section: "Items".into(),
            kind: GroupKind::Table,
            group: Some("Items".into()),
            page: 1,
            region: BBox::new(0.0, 100.0, 100.0, 100.0 + 10.0 * codes.len() as f64),
            result: ResultShape::List,
            start_at: start_at.map(|s| Trigger::parse("Items", s).unwrap()),
            stop_at: stop_at.map(|s| Trigger::parse("Items", s).unwrap()),
            fields,
        };
        (group, fragments)
    }

    fn loads(matched: &MatchedGroup) -> Vec<String> {
        matched.fields.iter().map(|f| f.load.to_string()).collect()
    }

    #[test]
    fn test_aggregate_tolerance_band() {
        let settings = Settings::default();
        let matcher = Matcher::new(&settings);
        let target = field("F", 100.0, FieldKind::Str);
        let mut fragments = vec![
            fragment(1, 10.0, 99.2, "above-ok"), // within 0.1*h above
            fragment(1, 30.0, 99.2, "second"),
            fragment(1, 10.0, 98.0, "too-high"),
            fragment(1, 10.0, 107.5, "below-ok"), // within 0.75*h
            fragment(1, 10.0, 108.0, "too-low"),
            fragment(1, 101.0, 100.0, "right"),
            fragment(2, 10.0, 100.0, "other-page"),
        ];
        crate::extraction::sort_fragments(&mut fragments);
        assert_eq!(
            matcher.aggregate(&target, &fragments),
            "above-ok second below-ok"
        );
    }

    #[test]
    fn test_aggregate_ignores_fragments_on_other_pages() {
        let settings = Settings::default();
        let matcher = Matcher::new(&settings);
        let mut target = field("F", 100.0, FieldKind::Str);
        target.page = 2;
        let fragments = vec![fragment(1, 10.0, 100.0, "one"), fragment(2, 10.0, 100.0, "two")];
        assert_eq!(matcher.aggregate(&target, &fragments), "two");
    }

    #[test]
    fn test_stop_at_excludes_trigger() {
        let settings = Settings::default();
        let matcher = Matcher::new(&settings);
        let (group, fragments) = rows_group(&["A1", "A2", "STOP", "A3"], None, Some("Code==STOP"));
        let mut diags = Diagnostics::new();
        let matched = matcher.match_group(&group, &fragments, &mut diags);
        assert_eq!(loads(&matched), vec!["A1", "A2"]);
        assert_eq!(matched.state, Activation::Stopped);
    }

    #[test]
    fn test_start_at_keeps_trigger() {
        let settings = Settings::default();
        let matcher = Matcher::new(&settings);
        let (group, fragments) =
            rows_group(&["x", "BEGIN", "A1", "END", "A2"], Some("Code==BEGIN"), Some("Code==END"));
        let mut diags = Diagnostics::new();
        let matched = matcher.match_group(&group, &fragments, &mut diags);
        assert_eq!(loads(&matched), vec!["BEGIN", "A1"]);
    }

    #[test]
    fn test_stop_at_fires_while_inactive() {
        let settings = Settings::default();
        let matcher = Matcher::new(&settings);
        let (group, fragments) =
            rows_group(&["END", "BEGIN", "A1"], Some("Code==BEGIN"), Some("Code==END"));
        let mut diags = Diagnostics::new();
        let matched = matcher.match_group(&group, &fragments, &mut diags);
        assert!(matched.fields.is_empty());
        assert_eq!(matched.state, Activation::Stopped);
    }

    #[test]
    fn test_start_at_never_fires() {
        let settings = Settings::default();
        let matcher = Matcher::new(&settings);
        let (group, fragments) = rows_group(&["A1", "A2"], Some("Code==BEGIN"), None);
        let mut diags = Diagnostics::new();
        let matched = matcher.match_group(&group, &fragments, &mut diags);
        assert!(matched.fields.is_empty());
        assert_eq!(matched.state, Activation::Inactive);
    }

    #[test]
    fn test_cast_failure_keeps_raw_text() {
        let settings = Settings::default();
        let matcher = Matcher::new(&settings);
        let (mut group, fragments) = rows_group(&["12-", "n/a-"], None, None);
        for f in &mut group.fields {
            f.kind = FieldKind::Int;
        }
        let mut diags = Diagnostics::new();
        let matched = matcher.match_group(&group, &fragments, &mut diags);
        assert_eq!(matched.fields[0].load, Load::Int(-12));
        assert_eq!(matched.fields[1].load, Load::Text("n/a-".into()));
        assert_eq!(diags.with_code(Code::FieldCast).count(), 1);
    }

    #[test]
    fn test_empty_fields_are_dropped() {
        let settings = Settings::default();
        let matcher = Matcher::new(&settings);
        let (mut group, fragments) = rows_group(&["A1"], None, None);
        group.fields.push(field("Items.R9.Code", 400.0, FieldKind::Str));
        let mut diags = Diagnostics::new();
        let matched = matcher.match_group(&group, &fragments, &mut diags);
        assert_eq!(matched.fields.len(), 1);
        assert_eq!(matched.fields[0].descriptor.name, "Items.R1.Code");
    }
}
