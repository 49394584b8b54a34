//! Layout compiler
//!
//! Turns the raw sections of a layout file into [`GroupDescriptor`]s, each carrying
//! the flat list of field rectangles its `kind` expands to.
//!
//! Validation is exhaustive rather than fail-fast: every section is checked, every
//! problem is recorded, and only then does [`compile_layout`] decide whether the
//! layout is usable. The caller always gets the complete diagnostic pass.

use crate::diagnostics::{Code, Diagnostic, Diagnostics};
use crate::error::LayoutError;
use crate::layout::descriptor::{
    BBox, FieldDescriptor, GroupDescriptor, GroupKind, Priority, ResultShape, Trigger,
};
use crate::layout::kind::FieldKind;
use crate::layout::range::{expand_axis, parse_range, RangeSpec, RangeToken};
use crate::layout::source::{LayoutSource, Section};
use serde::Serialize;
use std::collections::HashSet;

const REQUIRED_KEYS: [&str; 4] = ["kind", "page", "up-left", "down-right"];

const KNOWN_KEYS: [&str; 12] = [
    "kind",
    "page",
    "up-left",
    "down-right",
    "rows",
    "columns",
    "group",
    "cast",
    "result",
    "start-at",
    "stop-at",
    "priority",
];

/// Row label used when a `row` section declares no `rows`
pub const DEFAULT_ROW_LABEL: &str = "ROW1";

/// A compiled layout: groups in processing order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Layout {
    pub groups: Vec<GroupDescriptor>,
}

impl Layout {
    /// All field descriptors in processing order
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.groups.iter().flat_map(|g| g.fields.iter())
    }

    pub fn field_count(&self) -> usize {
        self.groups.iter().map(|g| g.fields.len()).sum()
    }

    pub fn group(&self, section: &str) -> Option<&GroupDescriptor> {
        self.groups.iter().find(|g| g.section == section)
    }
}

/// Successful compilation: the layout plus any warnings and recoverable errors
#[derive(Debug, Clone)]
pub struct Compiled {
    pub layout: Layout,
    pub diagnostics: Diagnostics,
}

/// Compile every section of a layout file
///
/// Fails with [`LayoutError::Validation`] if any section has at least one validation
/// error. The error carries every diagnostic of the pass, warnings included.
pub fn compile_layout(source: &LayoutSource) -> Result<Compiled, LayoutError> {
    let mut diagnostics = Diagnostics::new();
    let mut groups = Vec::with_capacity(source.sections.len());
    let mut failed = false;

    for section in &source.sections {
        match compile_section(section, &mut diagnostics) {
            Ok(group) => groups.push(group),
            Err(errors) => {
                failed = true;
                diagnostics.extend(errors);
            }
        }
    }

    if failed {
        return Err(LayoutError::Validation { diagnostics });
    }

    // Stable sort: sections at the same position keep their file order
    groups.sort_by(|a, b| {
        a.page
            .cmp(&b.page)
            .then(a.region.y0.total_cmp(&b.region.y0))
            .then(a.region.x0.total_cmp(&b.region.x0))
    });

    let mut seen = HashSet::new();
    for group in &groups {
        for field in &group.fields {
            if !seen.insert(field.name.as_str()) {
                diagnostics.warn(
                    Code::InvalidValue,
                    scope(&group.section),
                    format!("field name '{}' is already used", field.name),
                );
            }
        }
    }

    Ok(Compiled {
        layout: Layout { groups },
        diagnostics,
    })
}

fn scope(section: &str) -> String {
    format!("section '{}'", section)
}

/// Everything a section says, validated and typed
struct Validated {
    kind: GroupKind,
    page: u32,
    region: BBox,
    group: Option<String>,
    /// `group`, else the section name
    prefix: String,
    cast: Option<FieldKind>,
    priority: Priority,
    result: ResultShape,
    start_at: Option<Trigger>,
    stop_at: Option<Trigger>,
    rows: Option<RangeSpec>,
    columns: Option<RangeSpec>,
}

/// Validate and expand one section
///
/// Warnings and recoverable expansion errors go to `diags`. Validation errors are
/// returned, all of them, in the `Err` variant.
pub fn compile_section(
    section: &Section,
    diags: &mut Diagnostics,
) -> Result<GroupDescriptor, Vec<Diagnostic>> {
    let validated = validate(section, diags)?;
    let where_ = scope(&section.name);
    let default_kind = validated.cast.clone().unwrap_or_default();
    let region = validated.region;

    let fields = match validated.kind {
        GroupKind::Single => {
            let name = match &validated.group {
                Some(group) => format!("{}.{}", group, section.name),
                None => section.name.clone(),
            };
            vec![FieldDescriptor {
                name,
                bbox: region,
                kind: default_kind,
                page: validated.page,
            }]
        }
        GroupKind::Row | GroupKind::Table => {
            let rows = match &validated.rows {
                Some(spec) => expand_axis(spec, region.y0, region.y1, &where_, diags),
                None => vec![RangeToken {
                    label: DEFAULT_ROW_LABEL.to_string(),
                    kind: None,
                    start: region.y0,
                    end: region.y1,
                }],
            };
            let columns = match &validated.columns {
                Some(spec) => expand_axis(spec, region.x0, region.x1, &where_, diags),
                None => Vec::new(),
            };
            expand_grid(
                &validated.prefix,
                &rows,
                &columns,
                validated.priority,
                &default_kind,
                validated.page,
            )
        }
    };

    Ok(GroupDescriptor {
        section: section.name.clone(),
        kind: validated.kind,
        group: validated.group,
        page: validated.page,
        region,
        result: validated.result,
        start_at: validated.start_at,
        stop_at: validated.stop_at,
        fields,
    })
}

/// Cross product of row and column tokens, row-major
pub fn expand_grid(
    prefix: &str,
    rows: &[RangeToken],
    columns: &[RangeToken],
    priority: Priority,
    default_kind: &FieldKind,
    page: u32,
) -> Vec<FieldDescriptor> {
    let mut fields = Vec::with_capacity(rows.len() * columns.len());
    for row in rows {
        for column in columns {
            let kind = match priority {
                Priority::Column => &column.kind,
                Priority::Row => &row.kind,
            };
            fields.push(FieldDescriptor {
                name: format!("{}.{}.{}", prefix, row.label, column.label),
                bbox: BBox::new(column.start, row.start, column.end, row.end),
                kind: kind.clone().unwrap_or_else(|| default_kind.clone()),
                page,
            });
        }
    }
    fields
}

/// Parse an `"x,y"` pair
pub fn parse_point(value: &str) -> Result<(f64, f64), String> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() != 2 {
        return Err(format!(
            "expected two comma separated numbers, got '{}'",
            value
        ));
    }
    let number = |s: &str| {
        s.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("'{}' is not a number", s))
    };
    Ok((number(parts[0])?, number(parts[1])?))
}

fn validate(section: &Section, diags: &mut Diagnostics) -> Result<Validated, Vec<Diagnostic>> {
    let where_ = scope(&section.name);
    let mut errors: Vec<Diagnostic> = Vec::new();
    let mut error = |code: Code, message: String| {
        errors.push(Diagnostic::error(code, where_.clone(), message));
    };

    for key in REQUIRED_KEYS {
        if !section.contains(key) {
            error(Code::MissingKey, format!("missing mandatory key '{}'", key));
        }
    }

    let kind = section.get("kind").and_then(|value| {
        let kind = GroupKind::parse(value);
        if kind.is_none() {
            error(
                Code::InvalidValue,
                format!("kind '{}' is not one of single, row, table", value),
            );
        }
        kind
    });

    let page = section.get("page").and_then(|value| {
        match value.trim().parse::<u32>() {
            Ok(page) if page >= 1 => Some(page),
            _ => {
                error(
                    Code::InvalidValue,
                    format!("page '{}' is not a positive integer", value),
                );
                None
            }
        }
    });

    let mut point = |key: &str| {
        section.get(key).and_then(|value| match parse_point(value) {
            Ok(point) => Some(point),
            Err(message) => {
                error(Code::InvalidValue, format!("{}: {}", key, message));
                None
            }
        })
    };
    let up_left = point("up-left");
    let down_right = point("down-right");

    let region = match (up_left, down_right) {
        (Some((x0, y0)), Some((x1, y1))) => {
            if x0 > x1 || y0 > y1 {
                error(
                    Code::InvalidValue,
                    format!(
                        "up-left ({}, {}) is not above-left of down-right ({}, {})",
                        x0, y0, x1, y1
                    ),
                );
                None
            } else {
                Some(BBox::new(x0, y0, x1, y1))
            }
        }
        _ => None,
    };

    match kind {
        Some(GroupKind::Row) if !section.contains("columns") => {
            error(
                Code::MissingKey,
                "missing mandatory key 'columns' for kind=row".to_string(),
            );
        }
        Some(GroupKind::Table) => {
            for key in ["rows", "columns"] {
                if !section.contains(key) {
                    error(
                        Code::MissingKey,
                        format!("missing mandatory key '{}' for kind=table", key),
                    );
                }
            }
        }
        Some(GroupKind::Single) => {
            for key in ["rows", "columns", "priority"] {
                if section.contains(key) {
                    diags.warn(
                        Code::UnknownKey,
                        where_.clone(),
                        format!("'{}' is ignored for kind=single", key),
                    );
                }
            }
        }
        _ => {}
    }

    let cast = section.get("cast").and_then(|value| match value.parse::<FieldKind>() {
        Ok(kind) => Some(kind),
        Err(message) => {
            error(Code::InvalidValue, format!("cast: {}", message));
            None
        }
    });

    let priority = match section.get("priority") {
        None => Priority::default(),
        Some(value) => Priority::parse(value).unwrap_or_else(|| {
            error(
                Code::InvalidValue,
                format!("priority '{}' is not one of col, row", value),
            );
            Priority::default()
        }),
    };

    let group = section.get("group").map(str::to_string);
    if group.is_none() {
        diags.warn(
            Code::MissingOptional,
            where_.clone(),
            "no 'group' key, the section name is used as prefix",
        );
    }
    let prefix = group.clone().unwrap_or_else(|| section.name.clone());

    let mut trigger = |key: &str| {
        section.get(key).and_then(|value| match Trigger::parse(&prefix, value) {
            Ok(trigger) => Some(trigger),
            Err(message) => {
                error(Code::InvalidValue, format!("{}: {}", key, message));
                None
            }
        })
    };
    let start_at = trigger("start-at");
    let stop_at = trigger("stop-at");

    let result = match section.get("result") {
        None => {
            diags.warn(
                Code::MissingOptional,
                where_.clone(),
                "no 'result' key, defaulting to text",
            );
            ResultShape::default()
        }
        Some(value) => ResultShape::parse(value).unwrap_or_else(|message| {
            diags.warn(
                Code::InvalidValue,
                where_.clone(),
                format!("{}, fields pass through unshaped", message),
            );
            ResultShape::Passthrough(value.trim().to_string())
        }),
    };

    let mut grammar = |key: &str| {
        if kind == Some(GroupKind::Single) {
            return None;
        }
        section.get(key).and_then(|value| match parse_range(value) {
            Ok(spec) => Some(spec),
            Err(e) => {
                error(Code::RangeSyntax, format!("{} '{}': {}", key, value, e));
                None
            }
        })
    };
    let rows = grammar("rows");
    let columns = grammar("columns");

    for key in section.entries.keys() {
        if !KNOWN_KEYS.contains(&key.as_str()) {
            diags.warn(
                Code::UnknownKey,
                where_.clone(),
                format!("unknown key '{}'", key),
            );
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    match (kind, page, region) {
        (Some(kind), Some(page), Some(region)) => Ok(Validated {
            kind,
            page,
            region,
            group,
            prefix,
            cast,
            priority,
            result,
            start_at,
            stop_at,
            rows,
            columns,
        }),
        // Unreachable in practice: a missing piece always records an error above
        _ => Err(vec![Diagnostic::error(
            Code::MissingKey,
            where_,
            "incomplete section",
        )]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str) -> Section {
        Section::new(name)
            .with("kind", "table")
            .with("page", "1")
            .with("up-left", "0,0")
            .with("down-right", "100,100")
            .with("rows", "R1,R2")
            .with("columns", "C1,C2")
            .with("group", "T")
            .with("result", "dict")
    }

    #[test]
    fn test_table_expansion() {
        let mut diags = Diagnostics::new();
        let group = compile_section(&table("Grid"), &mut diags).unwrap();
        let fields: Vec<_> = group
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.bbox))
            .collect();
        assert_eq!(
            fields,
            vec![
                ("T.R1.C1", BBox::new(0.0, 0.0, 50.0, 50.0)),
                ("T.R1.C2", BBox::new(50.0, 0.0, 100.0, 50.0)),
                ("T.R2.C1", BBox::new(0.0, 50.0, 50.0, 100.0)),
                ("T.R2.C2", BBox::new(50.0, 50.0, 100.0, 100.0)),
            ]
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn test_table_cell_kind_priority() {
        let section = table("Grid")
            .with("rows", "R1(int),R2")
            .with("columns", "C1(float),C2");
        let mut diags = Diagnostics::new();
        let by_column = compile_section(&section, &mut diags).unwrap();
        let kinds: Vec<_> = by_column.fields.iter().map(|f| f.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![FieldKind::Float, FieldKind::Str, FieldKind::Float, FieldKind::Str]
        );

        let by_row = compile_section(&section.with("priority", "row"), &mut diags).unwrap();
        let kinds: Vec<_> = by_row.fields.iter().map(|f| f.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![FieldKind::Int, FieldKind::Int, FieldKind::Str, FieldKind::Str]
        );
    }

    #[test]
    fn test_single_field_naming() {
        let section = Section::new("Total")
            .with("kind", "single")
            .with("page", "2")
            .with("up-left", "10, 20")
            .with("down-right", "30,40")
            .with("cast", "float");
        let mut diags = Diagnostics::new();
        let group = compile_section(&section, &mut diags).unwrap();
        assert_eq!(group.fields.len(), 1);
        assert_eq!(group.fields[0].name, "Total");
        assert_eq!(group.fields[0].kind, FieldKind::Float);
        assert_eq!(group.fields[0].page, 2);
        assert_eq!(group.fields[0].bbox, BBox::new(10.0, 20.0, 30.0, 40.0));
        // no group, no result
        assert_eq!(diags.with_code(Code::MissingOptional).count(), 2);

        let grouped = compile_section(&section.with("group", "Invoice"), &mut diags).unwrap();
        assert_eq!(grouped.fields[0].name, "Invoice.Total");
    }

    #[test]
    fn test_row_without_rows_uses_single_band() {
        let section = Section::new("Line")
            .with("kind", "row")
            .with("page", "1")
            .with("up-left", "0,10")
            .with("down-right", "300,20")
            .with("columns", "Code :100: Desc");
        let mut diags = Diagnostics::new();
        let group = compile_section(&section, &mut diags).unwrap();
        let names: Vec<_> = group.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Line.ROW1.Code", "Line.ROW1.Desc"]);
        assert_eq!(group.fields[0].bbox, BBox::new(0.0, 10.0, 100.0, 20.0));
        assert_eq!(group.fields[1].bbox, BBox::new(100.0, 10.0, 300.0, 20.0));
    }

    #[test]
    fn test_row_repeats_per_rows_band() {
        let section = Section::new("Line")
            .with("kind", "row")
            .with("page", "1")
            .with("up-left", "0,100")
            .with("down-right", "300,130")
            .with("rows", "L1-3")
            .with("columns", "Code :100: Qty(int)")
            .with("group", "Lines");
        let mut diags = Diagnostics::new();
        let group = compile_section(&section, &mut diags).unwrap();
        let fields: Vec<_> = group
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.bbox.y0, f.bbox.y1))
            .collect();
        assert_eq!(
            fields,
            vec![
                ("Lines.L1.Code", 100.0, 110.0),
                ("Lines.L1.Qty", 100.0, 110.0),
                ("Lines.L2.Code", 110.0, 120.0),
                ("Lines.L2.Qty", 110.0, 120.0),
                ("Lines.L3.Code", 120.0, 130.0),
                ("Lines.L3.Qty", 120.0, 130.0),
            ]
        );
        assert_eq!(group.fields[1].kind, FieldKind::Int);
        assert_eq!(group.fields[5].bbox, BBox::new(100.0, 120.0, 300.0, 130.0));
    }

    #[test]
    fn test_validation_collects_every_error() {
        let section = Section::new("Broken")
            .with("kind", "table")
            .with("up-left", "1,2,3")
            .with("down-right", "x,4")
            .with("columns", "A,,B");
        let mut diags = Diagnostics::new();
        let errors = compile_section(&section, &mut diags).unwrap_err();
        let codes: Vec<_> = errors.iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            vec![
                Code::MissingKey,   // page
                Code::InvalidValue, // up-left
                Code::InvalidValue, // down-right
                Code::MissingKey,   // rows
                Code::RangeSyntax,  // columns
            ]
        );
    }

    #[test]
    fn test_unknown_kind_and_bad_page() {
        let section = Section::new("S")
            .with("kind", "grid")
            .with("page", "one")
            .with("up-left", "0,0")
            .with("down-right", "1,1");
        let mut diags = Diagnostics::new();
        let errors = compile_section(&section, &mut diags).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|d| d.code == Code::InvalidValue));
    }

    #[test]
    fn test_compile_layout_aborts_after_full_pass() {
        let source = LayoutSource::from_sections(vec![
            Section::new("Bad1").with("kind", "single"),
            table("Good"),
            Section::new("Bad2").with("kind", "row"),
        ]);
        match compile_layout(&source) {
            Err(LayoutError::Validation { diagnostics }) => {
                let scopes: HashSet<_> = diagnostics
                    .iter()
                    .filter(|d| d.is_error())
                    .map(|d| d.scope.clone())
                    .collect();
                assert!(scopes.contains("section 'Bad1'"));
                assert!(scopes.contains("section 'Bad2'"));
                assert!(!scopes.contains("section 'Good'"));
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_groups_sorted_top_to_bottom() {
        let single = |name: &str, page: &str, up_left: &str| {
            Section::new(name)
                .with("kind", "single")
                .with("page", page)
                .with("up-left", up_left)
                .with("down-right", "500,800")
        };
        let source = LayoutSource::from_sections(vec![
            single("Footer", "1", "10,700"),
            single("Second", "2", "10,10"),
            single("Right", "1", "300,50"),
            single("Left", "1", "10,50"),
        ]);
        let compiled = compile_layout(&source).unwrap();
        let order: Vec<_> = compiled
            .layout
            .groups
            .iter()
            .map(|g| g.section.as_str())
            .collect();
        assert_eq!(order, vec!["Left", "Right", "Footer", "Second"]);
    }

    #[test]
    fn test_malformed_row_dict_falls_back_to_passthrough() {
        let mut diags = Diagnostics::new();
        let group =
            compile_section(&table("Grid").with("result", "row_dict(T"), &mut diags).unwrap();
        assert_eq!(group.result, ResultShape::Passthrough("row_dict(T".into()));
        assert_eq!(diags.with_code(Code::InvalidValue).count(), 1);
    }

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("1.5, 2").unwrap(), (1.5, 2.0));
        assert!(parse_point("1").is_err());
        assert!(parse_point("1,2,3").is_err());
        assert!(parse_point("a,2").is_err());
    }
}
