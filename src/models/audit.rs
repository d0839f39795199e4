use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub action: String,
    pub target_type: String,
    pub target_id: i64,
    pub summary: String,
    pub details: Json<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntryPage {
    pub entries: Vec<AuditEntry>,
    pub page: i64,
    pub per_page: i64,
    pub total_count: i64,
    pub total_pages: i64,
}

/// Filters shared by the paginated list and the CSV export.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    /// Matched against username, summary and action.
    pub search: Option<String>,
    /// Action prefix, e.g. `form.` or `user.created`.
    pub action: Option<String>,
    /// Allowed action categories (text before the first `.`); `None` means all.
    pub categories: Option<Vec<String>>,
}

impl AuditFilter {
    fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)))
    }

    fn action_pattern(&self) -> Option<String> {
        self.action
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty() && *a != "all")
            .map(|a| format!("{}%", escape_like(a)))
    }
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

const FILTER_CLAUSE: &str = "\
    WHERE ($1::TEXT IS NULL OR username ILIKE $1 OR summary ILIKE $1 OR action ILIKE $1) \
      AND ($2::TEXT IS NULL OR action LIKE $2) \
      AND ($3::TEXT[] IS NULL OR split_part(action, '.', 1) = ANY($3))";

const SELECT_AUDIT: &str = "\
    SELECT id, user_id, username, action, target_type, target_id, summary, details, created_at \
    FROM audit_log";

pub async fn insert(
    pool: &PgPool,
    user_id: i64,
    action: &str,
    target_type: &str,
    target_id: i64,
    summary: &str,
    details: &Value,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO audit_log (user_id, username, action, target_type, target_id, summary, details) \
         VALUES ($1, COALESCE((SELECT username FROM users WHERE id = $1), ''), $2, $3, $4, $5, $6)",
    )
    .bind(user_id)
    .bind(action)
    .bind(target_type)
    .bind(target_id)
    .bind(summary)
    .bind(Json(details))
    .execute(pool)
    .await?;
    Ok(())
}

/// Clamp paging input and compute the row offset without overflowing.
fn page_window(page: i64, per_page: i64) -> (i64, i64, i64) {
    let page = page.max(1);
    let per_page = per_page.clamp(1, 100);
    (page, per_page, (page - 1).saturating_mul(per_page))
}

/// Find audit entries with pagination and optional filters, newest first.
pub async fn find_paginated(
    pool: &PgPool,
    filter: &AuditFilter,
    page: i64,
    per_page: i64,
) -> Result<AuditEntryPage, sqlx::Error> {
    let (page, per_page, offset) = page_window(page, per_page);
    let search = filter.search_pattern();
    let action = filter.action_pattern();

    let total_count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM audit_log {FILTER_CLAUSE}"))
        .bind(&search)
        .bind(&action)
        .bind(&filter.categories)
        .fetch_one(pool)
        .await?;
    let total_pages = (total_count + per_page - 1) / per_page;

    let entries = sqlx::query_as::<_, AuditEntry>(&format!(
        "{SELECT_AUDIT} {FILTER_CLAUSE} ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"
    ))
    .bind(&search)
    .bind(&action)
    .bind(&filter.categories)
    .bind(per_page)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(AuditEntryPage { entries, page, per_page, total_count, total_pages })
}

/// Every matching entry, newest first, for export.
pub async fn find_all(pool: &PgPool, filter: &AuditFilter) -> Result<Vec<AuditEntry>, sqlx::Error> {
    sqlx::query_as::<_, AuditEntry>(&format!(
        "{SELECT_AUDIT} {FILTER_CLAUSE} ORDER BY created_at DESC, id DESC"
    ))
    .bind(filter.search_pattern())
    .bind(filter.action_pattern())
    .bind(&filter.categories)
    .fetch_all(pool)
    .await
}

pub async fn clear(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM audit_log").execute(pool).await?;
    Ok(result.rows_affected())
}

pub async fn delete_older_than(pool: &PgPool, days: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM audit_log WHERE created_at < NOW() - make_interval(days => $1::INT)")
        .bind(days)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
