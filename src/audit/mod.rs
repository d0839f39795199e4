use serde_json::Value;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::audit;

/// Record an action. The summary is taken from `details.summary` when present,
/// otherwise the action name is used. Callers usually ignore the result.
pub async fn log(
    pool: &PgPool,
    user_id: i64,
    action: &str,
    target_type: &str,
    target_id: i64,
    details: Value,
) -> Result<(), AppError> {
    let summary = details
        .get("summary")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| action.to_string());
    audit::insert(pool, user_id, action, target_type, target_id, &summary, &details)
        .await
        .map_err(|e| {
            log::warn!("Failed to write audit entry '{action}': {e}");
            AppError::Db(e)
        })
}

/// Drop entries older than the retention window. Zero or less keeps everything.
pub async fn cleanup_old_entries(pool: &PgPool, retention_days: i64) {
    if retention_days <= 0 {
        return;
    }
    match audit::delete_older_than(pool, retention_days).await {
        Ok(0) => {}
        Ok(n) => log::info!("Removed {n} audit entries older than {retention_days} days"),
        Err(e) => log::warn!("Audit cleanup failed: {e}"),
    }
}

/// Category of an action: the text before the first `.`.
pub fn action_category(action: &str) -> &str {
    action.split('.').next().unwrap_or(action)
}
