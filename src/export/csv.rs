use crate::models::entry::FormEntry;
use crate::models::entry::values::string_form;
use crate::models::form::Form;
use crate::models::form::schema::{color_key, field_key};

use super::ExportOptions;

/// Flattened column keys: base fields, base colour, then each category's
/// fields followed by its colour. Colour columns only with `include_colors`.
pub fn csv_columns(form: &Form, include_colors: bool) -> Vec<String> {
    let mut cols: Vec<String> = form.fields.iter().map(|f| f.label.clone()).collect();
    if include_colors {
        cols.push(color_key(None));
    }
    for c in form.non_empty_categories() {
        cols.extend(c.fields.iter().map(|f| field_key(Some(&c.name), &f.label)));
        if include_colors {
            cols.push(color_key(Some(&c.name)));
        }
    }
    cols
}

/// RFC 4180 quoting: fields with commas, quotes or line breaks are quoted.
pub fn escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn build_csv(form: &Form, targets: &[FormEntry], opts: &ExportOptions) -> String {
    let cols = csv_columns(form, opts.include_colors);
    let mut out = String::new();
    out.push_str(&cols.iter().map(|c| escape(c)).collect::<Vec<_>>().join(","));
    out.push_str("\r\n");
    for e in targets {
        let line = cols
            .iter()
            .map(|k| escape(&e.value(k).map(string_form).unwrap_or_default()))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&line);
        out.push_str("\r\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::form::{FieldType, FormCategory, FormField};
    use chrono::Utc;
    use serde_json::json;

    fn form() -> Form {
        Form {
            id: 1,
            name: "Generators".into(),
            fields: vec![
                FormField::new("Serial", FieldType::Text),
                FormField::new("Active", FieldType::Checkbox),
            ],
            categories: vec![FormCategory {
                name: "Engine".into(),
                fields: vec![FormField::new("Notes", FieldType::Text)],
            }],
            sub_fields: vec![],
            has_sub_fields: false,
            pdf_description: None,
            pdf_image: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn entry() -> FormEntry {
        FormEntry {
            id: 1,
            form_id: 1,
            data: json!({
                "Serial": "G-1",
                "Active": true,
                "__color": "#fff",
                "Engine - Notes": "said \"hi\", then left"
            })
            .as_object()
            .cloned()
            .unwrap(),
            sub_rows: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn color_columns_follow_the_option() {
        assert_eq!(csv_columns(&form(), false), vec!["Serial", "Active", "Engine - Notes"]);
        assert_eq!(
            csv_columns(&form(), true),
            vec!["Serial", "Active", "__color", "Engine - Notes", "Engine - __color"]
        );
    }

    #[test]
    fn values_are_quoted_when_needed() {
        let csv = build_csv(&form(), &[entry()], &ExportOptions::default());
        let lines: Vec<&str> = csv.split("\r\n").collect();
        assert_eq!(lines[0], "Serial,Active,Engine - Notes");
        assert_eq!(lines[1], "G-1,true,\"said \"\"hi\"\", then left\"");
    }
}
