//! Section model shared by table display and every export format.
//!
//! A form renders as one section for its base fields plus one per category
//! that has fields. Rows without any meaningful value in a section are left
//! out of that section.

use std::collections::HashMap;

use serde_json::Value;

use crate::models::entry::FormEntry;
use crate::models::entry::values::{display_value, export_value, meta_has_value};
use crate::models::form::schema::{color_key, field_key, field_meta};
use crate::models::form::Form;

pub const BASE_SECTION_TITLE: &str = "Main fields";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellStyle {
    /// Checkboxes as ✓ / ✗, — when unset.
    #[default]
    Display,
    /// Checkboxes as ✓ or empty.
    Export,
}

#[derive(Debug, Clone, Default)]
pub struct SectionOptions {
    /// Base labels to keep; empty keeps all.
    pub columns: Vec<String>,
    /// Full category keys to keep, per category name.
    pub category_columns: HashMap<String, Vec<String>>,
    pub include_colors: bool,
    pub style: CellStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionRow {
    pub entry_id: i64,
    pub cells: Vec<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: String,
    pub category: Option<String>,
    pub labels: Vec<String>,
    pub keys: Vec<String>,
    pub rows: Vec<SectionRow>,
}

impl Section {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Labels of a category kept by the filter rules: the category's own
/// selection first, then the base selection read as full keys, else all.
fn category_labels(cat_name: &str, labels: Vec<String>, opts: &SectionOptions) -> Vec<String> {
    let selection = opts
        .category_columns
        .get(cat_name)
        .filter(|s| !s.is_empty())
        .or(Some(&opts.columns).filter(|s| !s.is_empty()));
    match selection {
        Some(sel) => labels
            .into_iter()
            .filter(|l| sel.contains(&field_key(Some(cat_name), l)))
            .collect(),
        None => labels,
    }
}

fn row_color(entry: &FormEntry, category: Option<&str>) -> Option<String> {
    match entry.value(&color_key(category)) {
        Some(Value::String(c)) if !c.trim().is_empty() => Some(c.trim().to_string()),
        _ => None,
    }
}

/// Assemble the sections for `entries`, keeping their order.
pub fn build_sections(form: &Form, entries: &[FormEntry], opts: &SectionOptions) -> Vec<Section> {
    let meta = field_meta(&form.fields, &form.categories);
    let mut sections = Vec::new();

    let mut build = |title: String, category: Option<&str>, labels: Vec<String>| {
        let keys: Vec<String> = labels.iter().map(|l| field_key(category, l)).collect();
        let rows = entries
            .iter()
            .filter(|e| keys.iter().any(|k| meta_has_value(meta.get(k), e.value(k))))
            .map(|e| SectionRow {
                entry_id: e.id,
                cells: keys
                    .iter()
                    .map(|k| match opts.style {
                        CellStyle::Display => display_value(meta.get(k), e.value(k)),
                        CellStyle::Export => export_value(meta.get(k), e.value(k)),
                    })
                    .collect(),
                color: if opts.include_colors { row_color(e, category) } else { None },
            })
            .collect();
        sections.push(Section {
            title,
            category: category.map(str::to_string),
            labels,
            keys,
            rows,
        });
    };

    if !form.fields.is_empty() {
        let mut labels: Vec<String> = form.fields.iter().map(|f| f.label.clone()).collect();
        if !opts.columns.is_empty() {
            labels.retain(|l| opts.columns.contains(l));
        }
        build(BASE_SECTION_TITLE.to_string(), None, labels);
    }

    for c in form.non_empty_categories() {
        let labels = category_labels(&c.name, c.fields.iter().map(|f| f.label.clone()).collect(), opts);
        build(c.name.clone(), Some(&c.name), labels);
    }

    sections
}
