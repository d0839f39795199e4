use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Select,
    Checkbox,
    Lookup,
    Exist,
}

impl FieldType {
    /// Lookup and exist fields reference another form's entries.
    pub fn is_cross_reference(&self) -> bool {
        matches!(self, FieldType::Lookup | FieldType::Exist)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_form_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_source_field: Option<String>,
}

impl FormField {
    pub fn new(label: &str, field_type: FieldType) -> Self {
        FormField {
            label: label.to_string(),
            field_type,
            required: false,
            options: None,
            lookup_form_id: None,
            lookup_source_field: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = Some(options.iter().map(|o| o.to_string()).collect());
        self
    }

    pub fn referencing(mut self, form_id: &str, source_field: &str) -> Self {
        self.lookup_form_id = Some(form_id.to_string());
        self.lookup_source_field = Some(source_field.to_string());
        self
    }

    /// Non-empty option list, if any.
    pub fn option_list(&self) -> Option<&[String]> {
        self.options.as_deref().filter(|o| !o.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormCategory {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FormField>,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct FormRow {
    pub id: i64,
    pub name: String,
    pub fields: Json<Vec<FormField>>,
    pub categories: Json<Vec<FormCategory>>,
    pub sub_fields: Json<Vec<FormField>>,
    pub pdf_description: Option<String>,
    pub pdf_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A form definition: the schema entries are validated and rendered against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub id: i64,
    pub name: String,
    pub fields: Vec<FormField>,
    pub categories: Vec<FormCategory>,
    pub sub_fields: Vec<FormField>,
    pub has_sub_fields: bool,
    pub pdf_description: Option<String>,
    pub pdf_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FormRow> for Form {
    fn from(row: FormRow) -> Self {
        let sub_fields = row.sub_fields.0;
        Form {
            id: row.id,
            name: row.name,
            fields: row.fields.0,
            categories: row.categories.0,
            has_sub_fields: !sub_fields.is_empty(),
            sub_fields,
            pdf_description: row.pdf_description,
            pdf_image: row.pdf_image,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl Form {
    /// Categories that actually carry fields; empty ones render nothing.
    pub fn non_empty_categories(&self) -> impl Iterator<Item = &FormCategory> {
        self.categories.iter().filter(|c| !c.fields.is_empty())
    }

    /// Every cross-referencing field with its storage key.
    pub fn cross_reference_fields(&self) -> Vec<(String, &FormField)> {
        let mut out: Vec<(String, &FormField)> = self
            .fields
            .iter()
            .filter(|f| f.field_type.is_cross_reference())
            .map(|f| (f.label.clone(), f))
            .collect();
        for c in &self.categories {
            for f in c.fields.iter().filter(|f| f.field_type.is_cross_reference()) {
                out.push((super::schema::field_key(Some(&c.name), &f.label), f));
            }
        }
        out
    }
}

/// Create body. Mirrors the definition shape clients send.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FormInput {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FormField>,
    #[serde(default)]
    pub categories: Vec<FormCategory>,
    #[serde(default)]
    pub sub_fields: Vec<FormField>,
    #[serde(default)]
    pub pdf_description: Option<String>,
    #[serde(default)]
    pub pdf_image: Option<String>,
}

/// Update body: only provided keys change.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FormPatch {
    pub name: Option<String>,
    pub fields: Option<Vec<FormField>>,
    pub categories: Option<Vec<FormCategory>>,
    pub sub_fields: Option<Vec<FormField>>,
    pub pdf_description: Option<String>,
    pub pdf_image: Option<String>,
}

impl FormPatch {
    /// The definition as it would look after applying this patch.
    pub fn apply_to(&self, current: &Form) -> FormInput {
        FormInput {
            name: self.name.clone().unwrap_or_else(|| current.name.clone()),
            fields: self.fields.clone().unwrap_or_else(|| current.fields.clone()),
            categories: self.categories.clone().unwrap_or_else(|| current.categories.clone()),
            sub_fields: self.sub_fields.clone().unwrap_or_else(|| current.sub_fields.clone()),
            pdf_description: self.pdf_description.clone().or_else(|| current.pdf_description.clone()),
            pdf_image: self.pdf_image.clone().or_else(|| current.pdf_image.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_uses_client_key_names() {
        let json = r#"{"label":"Owner","type":"lookup","lookupFormId":"4","lookupSourceField":"Name"}"#;
        let f: FormField = serde_json::from_str(json).unwrap();
        assert_eq!(f.field_type, FieldType::Lookup);
        assert!(!f.required);
        assert_eq!(f.lookup_form_id.as_deref(), Some("4"));

        let back = serde_json::to_value(&f).unwrap();
        assert_eq!(back["type"], "lookup");
        assert_eq!(back["lookupSourceField"], "Name");
        assert!(back.get("options").is_none());
    }

    #[test]
    fn unknown_field_type_is_rejected() {
        let json = r#"{"label":"x","type":"color"}"#;
        assert!(serde_json::from_str::<FormField>(json).is_err());
    }

    #[test]
    fn form_input_defaults_missing_lists() {
        let input: FormInput = serde_json::from_str(r#"{"name":"Generators"}"#).unwrap();
        assert!(input.fields.is_empty());
        assert!(input.categories.is_empty());
        assert!(input.sub_fields.is_empty());
    }
}
