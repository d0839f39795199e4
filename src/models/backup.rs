use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BackupRecord {
    pub id: i64,
    pub file_name: String,
    pub size_bytes: i64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

const SELECT_BACKUP: &str = "SELECT id, file_name, size_bytes, created_by, created_at FROM backups";

/// Newest first.
pub async fn find_all(pool: &PgPool) -> Result<Vec<BackupRecord>, sqlx::Error> {
    sqlx::query_as::<_, BackupRecord>(&format!("{SELECT_BACKUP} ORDER BY created_at DESC, id DESC"))
        .fetch_all(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<BackupRecord>, sqlx::Error> {
    sqlx::query_as::<_, BackupRecord>(&format!("{SELECT_BACKUP} WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn insert(
    pool: &PgPool,
    file_name: &str,
    size_bytes: i64,
    created_by: &str,
) -> Result<BackupRecord, sqlx::Error> {
    sqlx::query_as::<_, BackupRecord>(
        "INSERT INTO backups (file_name, size_bytes, created_by) VALUES ($1, $2, $3) \
         RETURNING id, file_name, size_bytes, created_by, created_at",
    )
    .bind(file_name)
    .bind(size_bytes)
    .bind(created_by)
    .fetch_one(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM backups WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM backups").fetch_one(pool).await
}

pub async fn last_created_at(pool: &PgPool) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    sqlx::query_scalar("SELECT MAX(created_at) FROM backups").fetch_one(pool).await
}
