use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local, Utc};

use crate::db::DbPool;
use crate::errors::AppError;
use crate::models::setting;

use super::schedule::{BackupSchedule, LAST_RUN_KEY, SCHEDULE_KEY};

pub const SCHEDULER_USER: &str = "scheduler";

/// Check the schedule once. Returns true when a backup was taken.
pub async fn run_if_due(pool: &DbPool, backup_dir: &Path) -> Result<bool, AppError> {
    let Some(schedule) = setting::get::<BackupSchedule>(pool, SCHEDULE_KEY).await? else {
        return Ok(false);
    };
    let last_run = setting::get::<DateTime<Utc>>(pool, LAST_RUN_KEY).await?;
    let now = Local::now().naive_local();
    let last_local = last_run.map(|t| t.with_timezone(&Local).naive_local());
    if !schedule.is_due(now, last_local) {
        return Ok(false);
    }

    // Mark first so a failing backup is not retried every minute.
    setting::put(pool, LAST_RUN_KEY, &Utc::now()).await?;
    let record = super::create_backup(pool, backup_dir, SCHEDULER_USER).await?;
    let _ = crate::audit::log(
        pool,
        0,
        "backup.scheduled",
        "backup",
        record.id,
        serde_json::json!({ "summary": format!("Scheduled backup {}", record.file_name) }),
    )
    .await;
    Ok(true)
}

pub fn spawn_scheduler(pool: DbPool, backup_dir: PathBuf) {
    actix_web::rt::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            match run_if_due(&pool, &backup_dir).await {
                Ok(true) => log::info!("Scheduled backup completed"),
                Ok(false) => {}
                Err(e) => log::error!("Scheduled backup failed: {e}"),
            }
        }
    });
}
