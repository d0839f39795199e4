use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::types::Json;

/// Read a setting and decode it. Missing or undecodable values yield `None`.
pub async fn get<T: DeserializeOwned>(pool: &PgPool, key: &str) -> Result<Option<T>, sqlx::Error> {
    let value: Option<Json<Value>> = sqlx::query_scalar("SELECT value FROM settings WHERE key = $1")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(value.and_then(|v| match serde_json::from_value(v.0) {
        Ok(t) => Some(t),
        Err(e) => {
            log::warn!("Setting '{key}' has an unexpected shape: {e}");
            None
        }
    }))
}

/// Insert or replace a setting.
pub async fn put<T: Serialize>(pool: &PgPool, key: &str, value: &T) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO settings (key, value, updated_at) VALUES ($1, $2, NOW()) \
         ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = NOW()",
    )
    .bind(key)
    .bind(Json(value))
    .execute(pool)
    .await?;
    Ok(())
}
