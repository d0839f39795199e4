use sqlx::PgPool;
use sqlx::types::Json;

use super::types::{CleanEntry, EntryRow, FormEntry};

const SELECT_ENTRY: &str = "\
    SELECT id, form_id, data, sub_rows, created_at, updated_at \
    FROM form_entries";

/// Entries of one form, oldest first.
pub async fn list_by_form(pool: &PgPool, form_id: i64) -> Result<Vec<FormEntry>, sqlx::Error> {
    let rows = sqlx::query_as::<_, EntryRow>(&format!(
        "{SELECT_ENTRY} WHERE form_id = $1 ORDER BY created_at ASC, id ASC"
    ))
    .bind(form_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(FormEntry::from).collect())
}

/// Entries across several forms, oldest first.
pub async fn list_by_forms(pool: &PgPool, form_ids: &[i64]) -> Result<Vec<FormEntry>, sqlx::Error> {
    if form_ids.is_empty() {
        return Ok(vec![]);
    }
    let rows = sqlx::query_as::<_, EntryRow>(&format!(
        "{SELECT_ENTRY} WHERE form_id = ANY($1) ORDER BY created_at ASC, id ASC"
    ))
    .bind(form_ids)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(FormEntry::from).collect())
}

/// One entry, only if it belongs to `form_id`.
pub async fn find(pool: &PgPool, form_id: i64, id: i64) -> Result<Option<FormEntry>, sqlx::Error> {
    let row = sqlx::query_as::<_, EntryRow>(&format!("{SELECT_ENTRY} WHERE form_id = $1 AND id = $2"))
        .bind(form_id)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(FormEntry::from))
}

pub async fn create(pool: &PgPool, form_id: i64, entry: &CleanEntry) -> Result<FormEntry, sqlx::Error> {
    let row = sqlx::query_as::<_, EntryRow>(
        "INSERT INTO form_entries (form_id, data, sub_rows) VALUES ($1, $2, $3) \
         RETURNING id, form_id, data, sub_rows, created_at, updated_at",
    )
    .bind(form_id)
    .bind(Json(&entry.data))
    .bind(Json(&entry.sub_rows))
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

/// Replace an entry's values. `None` when it does not exist in this form.
pub async fn update(
    pool: &PgPool,
    form_id: i64,
    id: i64,
    entry: &CleanEntry,
) -> Result<Option<FormEntry>, sqlx::Error> {
    let row = sqlx::query_as::<_, EntryRow>(
        "UPDATE form_entries SET data = $3, sub_rows = $4, updated_at = NOW() \
         WHERE form_id = $1 AND id = $2 \
         RETURNING id, form_id, data, sub_rows, created_at, updated_at",
    )
    .bind(form_id)
    .bind(id)
    .bind(Json(&entry.data))
    .bind(Json(&entry.sub_rows))
    .fetch_optional(pool)
    .await?;
    Ok(row.map(FormEntry::from))
}

pub async fn delete(pool: &PgPool, form_id: i64, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM form_entries WHERE form_id = $1 AND id = $2")
        .bind(form_id)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM form_entries").fetch_one(pool).await
}

pub async fn count_for_forms(pool: &PgPool, form_ids: &[i64]) -> Result<i64, sqlx::Error> {
    if form_ids.is_empty() {
        return Ok(0);
    }
    sqlx::query_scalar("SELECT COUNT(*) FROM form_entries WHERE form_id = ANY($1)")
        .bind(form_ids)
        .fetch_one(pool)
        .await
}

/// First entry of `form_id` whose `data[key]`, as trimmed text, equals `value`.
pub async fn find_matching(
    pool: &PgPool,
    form_id: i64,
    key: &str,
    value: &str,
) -> Result<Option<FormEntry>, sqlx::Error> {
    let row = sqlx::query_as::<_, EntryRow>(&format!(
        "{SELECT_ENTRY} WHERE form_id = $1 AND BTRIM(data ->> $2) = $3 \
         ORDER BY created_at ASC, id ASC LIMIT 1"
    ))
    .bind(form_id)
    .bind(key)
    .bind(value.trim())
    .fetch_optional(pool)
    .await?;
    Ok(row.map(FormEntry::from))
}

/// How many entries of `form_id` carry `value` under `key`, optionally ignoring one entry.
pub async fn count_matching(
    pool: &PgPool,
    form_id: i64,
    key: &str,
    value: &str,
    exclude_id: Option<i64>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM form_entries \
         WHERE form_id = $1 AND BTRIM(data ->> $2) = $3 AND ($4::BIGINT IS NULL OR id <> $4)",
    )
    .bind(form_id)
    .bind(key)
    .bind(value.trim())
    .bind(exclude_id)
    .fetch_one(pool)
    .await
}
