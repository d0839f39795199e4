//! Cross-form references: `lookup` values must exist in the source form,
//! `exist` values are reported back when they already do.

use serde_json::Value;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::form::{FieldType, Form, FormField};

use super::queries;
use super::types::{CleanEntry, EntryData, ExistFlag, FormEntry};
use super::values::string_form;

fn target_form_id(key: &str, field: &FormField) -> Result<i64, AppError> {
    field
        .lookup_form_id
        .as_deref()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .ok_or_else(|| AppError::BadRequest(format!("'{key}' references an invalid form")))
}

fn source_field<'a>(key: &str, field: &'a FormField) -> Result<&'a str, AppError> {
    field
        .lookup_source_field
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("'{key}' has no source field")))
}

#[derive(Default)]
struct Report {
    errors: Vec<String>,
    flags: Vec<ExistFlag>,
}

/// Check one value. Lookup misses become errors, exist hits become flags.
async fn check_value(
    pool: &PgPool,
    form_id: i64,
    key: &str,
    field: &FormField,
    value: Option<&Value>,
    exclude_id: Option<i64>,
    report: &mut Report,
) -> Result<(), AppError> {
    let Some(value) = value.map(string_form).filter(|v| !v.trim().is_empty()) else {
        return Ok(());
    };
    let target = target_form_id(key, field)?;
    let source = source_field(key, field)?;
    match field.field_type {
        FieldType::Lookup => {
            if queries::find_matching(pool, target, source, &value).await?.is_none() {
                report.errors.push(format!("'{key}': no entry with {source} = '{value}' in the referenced form"));
            }
        }
        FieldType::Exist => {
            let exclude = if target == form_id { exclude_id } else { None };
            let matches = queries::count_matching(pool, target, source, &value, exclude).await?;
            if matches > 0 {
                report.flags.push(ExistFlag { key: key.to_string(), value, matches });
            }
        }
        _ => {}
    }
    Ok(())
}

/// Validate lookup values and collect exist flags for an entry about to be saved.
///
/// `exclude_id` is the entry being updated, so it never flags itself.
pub async fn check_references(
    pool: &PgPool,
    form: &Form,
    entry: &CleanEntry,
    exclude_id: Option<i64>,
) -> Result<Vec<ExistFlag>, AppError> {
    let mut report = Report::default();

    for (key, field) in form.cross_reference_fields() {
        check_value(pool, form.id, &key, field, entry.data.get(&key), exclude_id, &mut report)
            .await?;
    }

    let sub_refs: Vec<&FormField> = form
        .sub_fields
        .iter()
        .filter(|f| f.field_type.is_cross_reference())
        .collect();
    for row in &entry.sub_rows {
        for field in &sub_refs {
            check_value(pool, form.id, &field.label, field, row.get(&field.label), exclude_id, &mut report)
                .await?;
        }
    }

    if report.errors.is_empty() {
        Ok(report.flags)
    } else {
        Err(AppError::Validation(report.errors))
    }
}

/// Where a cross-reference field points: the source form id and field label.
pub fn lookup_target<'a>(form: &'a Form, key: &str) -> Result<(i64, &'a str), AppError> {
    let field = form
        .cross_reference_fields()
        .into_iter()
        .find(|(k, _)| k == key)
        .map(|(_, f)| f)
        .or_else(|| {
            form.sub_fields
                .iter()
                .find(|f| f.label == key && f.field_type.is_cross_reference())
        })
        .ok_or_else(|| AppError::BadRequest(format!("'{key}' is not a lookup field of this form")))?;

    Ok((target_form_id(key, field)?, source_field(key, field)?))
}

/// The source entry a lookup value points at, for auto-fill.
/// Callers check access to `target` first.
pub async fn resolve(pool: &PgPool, target: i64, source: &str, value: &str) -> Result<EntryData, AppError> {
    let found: Option<FormEntry> = queries::find_matching(pool, target, source, value).await?;
    found.map(|e| e.data).ok_or(AppError::NotFound)
}
