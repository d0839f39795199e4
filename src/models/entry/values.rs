//! Value rules for schema-less entry data: presence, normalization and display.

use serde_json::{Number, Value};

use crate::models::form::schema::{FieldMeta, color_key, field_key};
use crate::models::form::{FieldType, Form, FormField};

use super::types::{CleanEntry, EntryData, EntryInput};

/// Whether a value counts as filled in for the given field type.
pub fn has_meaningful_value(field_type: FieldType, v: Option<&Value>) -> bool {
    let Some(v) = v else { return false };
    if v.is_null() {
        return false;
    }
    match field_type {
        FieldType::Text | FieldType::Select => !string_form(v).trim().is_empty(),
        FieldType::Number => match v {
            Value::Number(_) => true,
            Value::String(s) => parse_number(s).is_some(),
            _ => false,
        },
        FieldType::Date => match v {
            Value::String(s) => !s.is_empty(),
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            _ => true,
        },
        FieldType::Checkbox => v.is_boolean(),
        FieldType::Lookup | FieldType::Exist => match v {
            Value::Array(a) => !a.is_empty(),
            other => !string_form(other).trim().is_empty(),
        },
    }
}

/// Same check, driven by the metadata map used during rendering.
pub fn meta_has_value(meta: Option<&FieldMeta>, v: Option<&Value>) -> bool {
    meta.is_some_and(|m| has_meaningful_value(m.field_type, v))
}

/// Checkbox truthiness as exports read it.
pub fn is_checked(v: Option<&Value>) -> bool {
    match v {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "true" || s == "1",
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    }
}

/// Table cell text: checkboxes as ✓ / ✗, anything else as plain text.
pub fn display_value(meta: Option<&FieldMeta>, v: Option<&Value>) -> String {
    if meta.is_some_and(|m| m.field_type == FieldType::Checkbox) {
        return match v {
            Some(Value::Bool(true)) => "✓".to_string(),
            Some(Value::Bool(false)) => "✗".to_string(),
            _ => "—".to_string(),
        };
    }
    v.map(string_form).unwrap_or_default()
}

/// Export cell text: checked boxes as ✓, unchecked as empty.
pub fn export_value(meta: Option<&FieldMeta>, v: Option<&Value>) -> String {
    if meta.is_some_and(|m| m.field_type == FieldType::Checkbox) {
        return if is_checked(v) { "✓".to_string() } else { String::new() };
    }
    v.map(string_form).unwrap_or_default()
}

/// The string form of a JSON value, without quotes around strings.
pub fn string_form(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(string_form).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|f| f.is_finite())
}

fn number_value(s: &str) -> Option<Value> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::from(i));
    }
    parse_number(s).and_then(Number::from_f64).map(Value::Number)
}

/// Normalize a date to `YYYY-MM-DD`.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD` and RFC 3339 timestamps. Only ranges are
/// checked (month 1-12, day 1-31): Jalali dates are stored as entered.
pub fn normalize_date(raw: &str) -> Option<String> {
    let s = raw.trim();
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(ts.date_naive().format("%Y-%m-%d").to_string());
    }
    let parts: Vec<&str> = s.split(['-', '/']).collect();
    if parts.len() != 3 || parts[0].len() != 4 {
        return None;
    }
    let year: u32 = parts[0].parse().ok()?;
    let month: u32 = parts[1].parse().ok()?;
    let day: u32 = parts[2].parse().ok()?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    Some(format!("{year:04}-{month:02}-{day:02}"))
}

/// Normalize one field value. `Ok(None)` means "not filled in", which is dropped from storage.
fn normalize_value(field: &FormField, key: &str, v: Option<&Value>) -> Result<Option<Value>, String> {
    if !has_meaningful_value(field.field_type, v) {
        return Ok(None);
    }
    let Some(v) = v else { return Ok(None) };
    match field.field_type {
        FieldType::Number => Ok(match v {
            Value::String(s) => number_value(s),
            other => Some(other.clone()),
        }),
        FieldType::Checkbox => Ok(Some(v.clone())),
        FieldType::Date => match v {
            Value::String(s) => normalize_date(s)
                .map(|d| Some(Value::String(d)))
                .ok_or_else(|| format!("'{key}' must be a date (YYYY-MM-DD)")),
            _ => Err(format!("'{key}' must be a date (YYYY-MM-DD)")),
        },
        FieldType::Select => {
            let s = string_form(v).trim().to_string();
            if let Some(options) = field.option_list() {
                if !options.iter().any(|o| o == &s) {
                    return Err(format!("'{key}' must be one of: {}", options.join(", ")));
                }
            }
            Ok(Some(Value::String(s)))
        }
        FieldType::Text | FieldType::Lookup | FieldType::Exist => {
            Ok(Some(Value::String(string_form(v).trim().to_string())))
        }
    }
}

/// Normalize a field list into `out`, keyed by `key_of(label)`.
fn normalize_fields<'a>(
    fields: impl Iterator<Item = &'a FormField>,
    key_of: impl Fn(&str) -> String,
    raw: &EntryData,
    out: &mut EntryData,
    errors: &mut Vec<String>,
    row_suffix: &str,
) {
    for f in fields {
        let key = key_of(&f.label);
        let v = raw.get(&key);
        if f.required && !has_meaningful_value(f.field_type, v) {
            errors.push(format!("'{key}'{row_suffix} is required"));
            continue;
        }
        match normalize_value(f, &key, v) {
            Ok(Some(clean)) => {
                out.insert(key, clean);
            }
            Ok(None) => {}
            Err(e) => errors.push(format!("{e}{row_suffix}")),
        }
    }
}

fn keep_color(raw: &EntryData, key: String, out: &mut EntryData) {
    if let Some(Value::String(c)) = raw.get(&key) {
        let c = c.trim();
        if !c.is_empty() {
            out.insert(key, Value::String(c.to_string()));
        }
    }
}

/// Validate and normalize a submitted entry against its form.
///
/// Required fields are checked first; all problems are returned together.
/// Unknown keys are dropped, and so are fields without a meaningful value.
pub fn normalize_entry(form: &Form, input: &EntryInput) -> Result<CleanEntry, Vec<String>> {
    let mut errors = Vec::new();
    let mut data = EntryData::new();

    normalize_fields(form.fields.iter(), |l| l.to_string(), &input.data, &mut data, &mut errors, "");
    for c in &form.categories {
        normalize_fields(
            c.fields.iter(),
            |l| field_key(Some(&c.name), l),
            &input.data,
            &mut data,
            &mut errors,
            "",
        );
    }

    keep_color(&input.data, color_key(None), &mut data);
    for c in &form.categories {
        keep_color(&input.data, color_key(Some(&c.name)), &mut data);
    }

    let mut sub_rows = Vec::new();
    if !form.sub_fields.is_empty() {
        for (i, row) in input.sub_rows.iter().enumerate() {
            let filled = form
                .sub_fields
                .iter()
                .any(|f| has_meaningful_value(f.field_type, row.get(&f.label)));
            if !filled {
                continue;
            }
            let mut clean = EntryData::new();
            let suffix = format!(" (row {})", i + 1);
            normalize_fields(form.sub_fields.iter(), |l| l.to_string(), row, &mut clean, &mut errors, &suffix);
            sub_rows.push(clean);
        }
    }

    if errors.is_empty() {
        Ok(CleanEntry { data, sub_rows })
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::form::FormCategory;
    use chrono::Utc;
    use serde_json::json;

    fn form() -> Form {
        Form {
            id: 1,
            name: "Generators".into(),
            fields: vec![
                FormField::new("Serial", FieldType::Text).required(),
                FormField::new("Power", FieldType::Number),
                FormField::new("Installed", FieldType::Date),
                FormField::new("Status", FieldType::Select).with_options(&["ok", "fault"]),
                FormField::new("Active", FieldType::Checkbox),
            ],
            categories: vec![FormCategory {
                name: "Engine".into(),
                fields: vec![
                    FormField::new("Oil", FieldType::Text),
                    FormField::new("Hours", FieldType::Number).required(),
                ],
            }],
            sub_fields: vec![
                FormField::new("Part", FieldType::Text).required(),
                FormField::new("Qty", FieldType::Number),
            ],
            has_sub_fields: true,
            pdf_description: None,
            pdf_image: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn data(v: Value) -> EntryData {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn meaningful_value_rules() {
        assert!(!has_meaningful_value(FieldType::Text, None));
        assert!(!has_meaningful_value(FieldType::Text, Some(&json!(null))));
        assert!(!has_meaningful_value(FieldType::Text, Some(&json!("   "))));
        assert!(has_meaningful_value(FieldType::Text, Some(&json!("a"))));
        assert!(has_meaningful_value(FieldType::Number, Some(&json!(0))));
        assert!(has_meaningful_value(FieldType::Number, Some(&json!(" 12.5 "))));
        assert!(!has_meaningful_value(FieldType::Number, Some(&json!("abc"))));
        assert!(!has_meaningful_value(FieldType::Number, Some(&json!(""))));
        assert!(!has_meaningful_value(FieldType::Number, Some(&json!(true))));
        assert!(has_meaningful_value(FieldType::Checkbox, Some(&json!(false))));
        assert!(!has_meaningful_value(FieldType::Checkbox, Some(&json!("true"))));
        assert!(has_meaningful_value(FieldType::Date, Some(&json!("1403-08-12"))));
        assert!(!has_meaningful_value(FieldType::Date, Some(&json!(""))));
        assert!(!has_meaningful_value(FieldType::Exist, Some(&json!(" "))));
    }

    #[test]
    fn dates_normalize_to_iso_shape() {
        assert_eq!(normalize_date("2024-3-5").as_deref(), Some("2024-03-05"));
        assert_eq!(normalize_date("1403/08/12").as_deref(), Some("1403-08-12"));
        assert_eq!(normalize_date("2024-06-01T10:00:00Z").as_deref(), Some("2024-06-01"));
        assert_eq!(normalize_date("2024-13-01"), None);
        assert_eq!(normalize_date("yesterday"), None);
        assert_eq!(normalize_date("24-01-01"), None);
    }

    #[test]
    fn normalize_coerces_and_drops_empty_values() {
        let input = EntryInput {
            data: data(json!({
                "Serial": "  G-100 ",
                "Power": "250",
                "Installed": "2024/01/09",
                "Status": "ok",
                "Active": true,
                "Engine - Hours": 12.5,
                "Engine - Oil": "",
                "__color": " #ff0000 ",
                "Engine - __color": "",
                "Unknown": "dropped"
            })),
            sub_rows: vec![],
        };
        let clean = normalize_entry(&form(), &input).unwrap();
        assert_eq!(clean.data["Serial"], json!("G-100"));
        assert_eq!(clean.data["Power"], json!(250));
        assert_eq!(clean.data["Installed"], json!("2024-01-09"));
        assert_eq!(clean.data["Active"], json!(true));
        assert_eq!(clean.data["Engine - Hours"], json!(12.5));
        assert_eq!(clean.data["__color"], json!("#ff0000"));
        assert!(!clean.data.contains_key("Engine - Oil"));
        assert!(!clean.data.contains_key("Engine - __color"));
        assert!(!clean.data.contains_key("Unknown"));
    }

    #[test]
    fn missing_required_fields_are_all_reported() {
        let input = EntryInput { data: data(json!({"Power": "x"})), sub_rows: vec![] };
        let errors = normalize_entry(&form(), &input).unwrap_err();
        assert!(errors.contains(&"'Serial' is required".to_string()));
        assert!(errors.contains(&"'Engine - Hours' is required".to_string()));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn unparsable_numbers_count_as_not_filled_in() {
        let input = EntryInput {
            data: data(json!({"Serial": "a", "Engine - Hours": "12", "Power": "x"})),
            sub_rows: vec![],
        };
        let clean = normalize_entry(&form(), &input).unwrap();
        assert!(!clean.data.contains_key("Power"));
        assert_eq!(clean.data["Engine - Hours"], json!(12));
    }

    #[test]
    fn select_must_match_an_option() {
        let input = EntryInput {
            data: data(json!({"Serial": "a", "Engine - Hours": 1, "Status": "broken"})),
            sub_rows: vec![],
        };
        let errors = normalize_entry(&form(), &input).unwrap_err();
        assert_eq!(errors, vec!["'Status' must be one of: ok, fault".to_string()]);
    }

    #[test]
    fn sub_rows_are_cleaned_per_row() {
        let input = EntryInput {
            data: data(json!({"Serial": "a", "Engine - Hours": 1})),
            sub_rows: vec![
                data(json!({"Part": "filter", "Qty": "2"})),
                data(json!({"Part": "", "Qty": ""})),
                data(json!({"Qty": 3})),
            ],
        };
        let errors = normalize_entry(&form(), &input).unwrap_err();
        assert_eq!(errors, vec!["'Part' (row 3) is required".to_string()]);

        let input = EntryInput {
            data: data(json!({"Serial": "a", "Engine - Hours": 1})),
            sub_rows: vec![data(json!({"Part": "filter", "Qty": "2"})), data(json!({}))],
        };
        let clean = normalize_entry(&form(), &input).unwrap();
        assert_eq!(clean.sub_rows.len(), 1);
        assert_eq!(clean.sub_rows[0]["Qty"], json!(2));
    }

    #[test]
    fn display_and_export_text_for_checkboxes() {
        let meta = FieldMeta { field_type: FieldType::Checkbox, options: None, required: false };
        assert_eq!(display_value(Some(&meta), Some(&json!(true))), "✓");
        assert_eq!(display_value(Some(&meta), Some(&json!(false))), "✗");
        assert_eq!(display_value(Some(&meta), None), "—");
        assert_eq!(export_value(Some(&meta), Some(&json!("1"))), "✓");
        assert_eq!(export_value(Some(&meta), Some(&json!(false))), "");
        assert_eq!(display_value(None, Some(&json!(42))), "42");
    }
}
