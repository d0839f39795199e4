//! Form definition rules: storage keys, field metadata and validation.

use std::collections::{HashMap, HashSet};

use super::types::{FieldType, FormCategory, FormField, FormInput};

/// Separator between a category name and a field label in entry keys.
pub const CATEGORY_SEPARATOR: &str = " - ";

/// Reserved key for the row colour.
pub const COLOR_KEY: &str = "__color";

const MAX_NAME_LEN: usize = 200;
const MAX_LABEL_LEN: usize = 200;

/// Storage key for a field: its label, or `"<category> - <label>"` inside a category.
pub fn field_key(category: Option<&str>, label: &str) -> String {
    match category {
        Some(c) => format!("{c}{CATEGORY_SEPARATOR}{label}"),
        None => label.to_string(),
    }
}

/// Colour key for the base row or a category row.
pub fn color_key(category: Option<&str>) -> String {
    field_key(category, COLOR_KEY)
}

/// Per-key metadata used by value checks and rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMeta {
    pub field_type: FieldType,
    pub options: Option<Vec<String>>,
    pub required: bool,
}

impl From<&FormField> for FieldMeta {
    fn from(f: &FormField) -> Self {
        FieldMeta {
            field_type: f.field_type,
            options: f.options.clone(),
            required: f.required,
        }
    }
}

/// Build the key → metadata map over base and category fields.
pub fn field_meta(fields: &[FormField], categories: &[FormCategory]) -> HashMap<String, FieldMeta> {
    let mut meta = HashMap::new();
    for f in fields {
        meta.insert(f.label.clone(), FieldMeta::from(f));
    }
    for c in categories {
        for f in &c.fields {
            meta.insert(field_key(Some(&c.name), &f.label), FieldMeta::from(f));
        }
    }
    meta
}

/// Validate a definition. Returns every problem found, empty when valid.
pub fn validate_definition(input: &FormInput) -> Vec<String> {
    let mut errors = Vec::new();

    let name = input.name.trim();
    if name.is_empty() {
        errors.push("Form name is required".to_string());
    } else if name.chars().count() > MAX_NAME_LEN {
        errors.push(format!("Form name must be at most {MAX_NAME_LEN} characters"));
    }

    validate_field_list(&input.fields, "Fields", &mut errors);

    let mut seen_categories = HashSet::new();
    for (i, c) in input.categories.iter().enumerate() {
        let cname = c.name.trim();
        if cname.is_empty() {
            errors.push(format!("Category #{} needs a name", i + 1));
            continue;
        }
        if cname.contains(CATEGORY_SEPARATOR) {
            errors.push(format!("Category '{cname}' may not contain '{}'", CATEGORY_SEPARATOR.trim()));
        }
        if !seen_categories.insert(cname.to_string()) {
            errors.push(format!("Duplicate category '{cname}'"));
        }
        validate_field_list(&c.fields, &format!("Category '{cname}'"), &mut errors);
    }

    validate_field_list(&input.sub_fields, "Sub-fields", &mut errors);

    errors
}

fn validate_field_list(fields: &[FormField], scope: &str, errors: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for (i, f) in fields.iter().enumerate() {
        let label = f.label.trim();
        if label.is_empty() {
            errors.push(format!("{scope}: field #{} needs a label", i + 1));
            continue;
        }
        if label.chars().count() > MAX_LABEL_LEN {
            errors.push(format!("{scope}: label '{label}' is too long"));
        }
        if label == COLOR_KEY {
            errors.push(format!("{scope}: '{COLOR_KEY}' is a reserved label"));
        }
        if !seen.insert(label.to_string()) {
            errors.push(format!("{scope}: duplicate label '{label}'"));
        }
        if let Some(options) = &f.options {
            if options.iter().any(|o| o.trim().is_empty()) {
                errors.push(format!("{scope}: '{label}' has an empty option"));
            }
        }
        if f.field_type.is_cross_reference() {
            let form_ok = f.lookup_form_id.as_deref().is_some_and(|v| !v.trim().is_empty());
            let source_ok = f.lookup_source_field.as_deref().is_some_and(|v| !v.trim().is_empty());
            if !form_ok || !source_ok {
                errors.push(format!(
                    "{scope}: '{label}' needs lookupFormId and lookupSourceField"
                ));
            }
        }
    }
}

/// Trim names and labels in place so stored keys match what validation checked.
pub fn normalize_definition(input: &mut FormInput) {
    input.name = input.name.trim().to_string();
    trim_fields(&mut input.fields);
    for c in &mut input.categories {
        c.name = c.name.trim().to_string();
        trim_fields(&mut c.fields);
    }
    trim_fields(&mut input.sub_fields);
    input.pdf_description = input
        .pdf_description
        .take()
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    input.pdf_image = input
        .pdf_image
        .take()
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
}

fn trim_fields(fields: &mut [FormField]) {
    for f in fields {
        f.label = f.label.trim().to_string();
        if let Some(opts) = f.options.as_mut() {
            for o in opts.iter_mut() {
                *o = o.trim().to_string();
            }
        }
        f.lookup_form_id = f.lookup_form_id.take().map(|v| v.trim().to_string());
        f.lookup_source_field = f.lookup_source_field.take().map(|v| v.trim().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(fields: Vec<FormField>, categories: Vec<FormCategory>) -> FormInput {
        FormInput {
            name: "Generators".into(),
            fields,
            categories,
            ..Default::default()
        }
    }

    #[test]
    fn category_keys_are_prefixed() {
        assert_eq!(field_key(None, "Serial"), "Serial");
        assert_eq!(field_key(Some("Engine"), "Oil"), "Engine - Oil");
        assert_eq!(color_key(Some("Engine")), "Engine - __color");
        assert_eq!(color_key(None), "__color");
    }

    #[test]
    fn meta_covers_base_and_category_fields() {
        let fields = vec![FormField::new("Serial", FieldType::Text).required()];
        let cats = vec![FormCategory {
            name: "Engine".into(),
            fields: vec![FormField::new("Checked", FieldType::Checkbox)],
        }];
        let meta = field_meta(&fields, &cats);
        assert_eq!(meta.len(), 2);
        assert!(meta["Serial"].required);
        assert_eq!(meta["Engine - Checked"].field_type, FieldType::Checkbox);
    }

    #[test]
    fn valid_definition_has_no_errors() {
        let def = input(
            vec![
                FormField::new("Serial", FieldType::Text).required(),
                FormField::new("Status", FieldType::Select).with_options(&["ok", "fault"]),
                FormField::new("Site", FieldType::Lookup).referencing("3", "Name"),
            ],
            vec![FormCategory {
                name: "Engine".into(),
                fields: vec![FormField::new("Serial", FieldType::Text)],
            }],
        );
        assert!(validate_definition(&def).is_empty());
    }

    #[test]
    fn every_problem_is_reported() {
        let mut def = input(
            vec![
                FormField::new("Serial", FieldType::Text),
                FormField::new("Serial", FieldType::Number),
                FormField::new("  ", FieldType::Text),
                FormField::new("__color", FieldType::Text),
                FormField::new("Site", FieldType::Exist),
            ],
            vec![
                FormCategory { name: "A - B".into(), fields: vec![] },
                FormCategory { name: "Engine".into(), fields: vec![] },
                FormCategory { name: "Engine".into(), fields: vec![] },
            ],
        );
        def.name = " ".into();
        let errors = validate_definition(&def);
        assert!(errors.iter().any(|e| e == "Form name is required"));
        assert!(errors.iter().any(|e| e.contains("duplicate label 'Serial'")));
        assert!(errors.iter().any(|e| e.contains("field #3 needs a label")));
        assert!(errors.iter().any(|e| e.contains("reserved label")));
        assert!(errors.iter().any(|e| e.contains("'Site' needs lookupFormId")));
        assert!(errors.iter().any(|e| e.contains("may not contain")));
        assert!(errors.iter().any(|e| e.contains("Duplicate category 'Engine'")));
    }

    #[test]
    fn normalize_trims_and_drops_blank_pdf_settings() {
        let mut def = input(vec![FormField::new(" Serial ", FieldType::Text)], vec![]);
        def.name = "  Generators ".into();
        def.pdf_description = Some("   ".into());
        def.pdf_image = Some(" logo.png ".into());
        normalize_definition(&mut def);
        assert_eq!(def.name, "Generators");
        assert_eq!(def.fields[0].label, "Serial");
        assert!(def.pdf_description.is_none());
        assert_eq!(def.pdf_image.as_deref(), Some("logo.png"));
    }
}
