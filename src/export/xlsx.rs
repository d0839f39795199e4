use std::collections::HashSet;

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatPattern, Workbook, Worksheet};

use crate::errors::AppError;
use crate::models::entry::FormEntry;
use crate::models::form::schema::field_meta;
use crate::models::form::{FieldType, Form};
use crate::models::table::{CellStyle, Section, build_sections};

use super::ExportOptions;
use super::color::parse_color;

const MAX_SHEET_NAME: usize = 31;

/// Column width from the header length, clamped to 12..=40.
pub fn column_width(header: &str) -> f64 {
    (header.chars().count() + 6).clamp(12, 40) as f64
}

/// Make a name Excel accepts: no `[]:*?/\`, no leading/trailing apostrophe,
/// at most 31 characters, unique (case-insensitive) within the workbook.
pub fn sheet_name(raw: &str, used: &mut HashSet<String>) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\') { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'').trim();
    let base: String = if cleaned.is_empty() { "Sheet".to_string() } else { cleaned.chars().take(MAX_SHEET_NAME).collect() };

    let mut name = base.clone();
    let mut n = 2;
    while used.contains(&name.to_lowercase()) {
        let suffix = format!(" ({n})");
        let keep = MAX_SHEET_NAME - suffix.chars().count();
        name = format!("{}{suffix}", base.chars().take(keep).collect::<String>());
        n += 1;
    }
    used.insert(name.to_lowercase());
    name
}

fn write_section(
    ws: &mut Worksheet,
    section: &Section,
    numeric: &[bool],
) -> Result<(), AppError> {
    let header = Format::new().set_bold().set_align(FormatAlign::Right);
    let plain = Format::new().set_align(FormatAlign::Right);

    for (col, label) in section.labels.iter().enumerate() {
        let col = col as u16;
        ws.write_string_with_format(0, col, label, &header)?;
        ws.set_column_width(col, column_width(label))?;
    }

    for (i, row) in section.rows.iter().enumerate() {
        let r = (i + 1) as u32;
        let format = match row.color.as_deref().and_then(parse_color) {
            Some(rgb) => plain
                .clone()
                .set_pattern(FormatPattern::Solid)
                .set_background_color(Color::RGB(rgb)),
            None => plain.clone(),
        };
        for (col, cell) in row.cells.iter().enumerate() {
            let c = col as u16;
            match cell.trim().parse::<f64>() {
                Ok(n) if numeric.get(col).copied().unwrap_or(false) && n.is_finite() => {
                    ws.write_number_with_format(r, c, n, &format)?;
                }
                _ => {
                    ws.write_string_with_format(r, c, cell, &format)?;
                }
            }
        }
    }
    Ok(())
}

/// One right-to-left worksheet per section.
pub fn build_workbook(form: &Form, targets: &[FormEntry], opts: &ExportOptions) -> Result<Vec<u8>, AppError> {
    let sections = build_sections(form, targets, &opts.section_options(CellStyle::Export));
    if sections.is_empty() {
        return Err(AppError::BadRequest("This form has no fields to export".to_string()));
    }
    let meta = field_meta(&form.fields, &form.categories);

    let mut workbook = Workbook::new();
    let mut used = HashSet::new();
    for section in &sections {
        let mut ws = Worksheet::new();
        let name = sheet_name(&section.title, &mut used);
        ws.set_name(&name)?;
        ws.set_right_to_left(true);
        let numeric: Vec<bool> = section
            .keys
            .iter()
            .map(|k| meta.get(k).is_some_and(|m| m.field_type == FieldType::Number))
            .collect();
        write_section(&mut ws, section, &numeric)?;
        workbook.push_worksheet(ws);
    }
    Ok(workbook.save_to_buffer()?)
}
