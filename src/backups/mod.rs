//! JSON snapshots of forms, entries, users and settings.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::backup::{self, BackupRecord};

pub mod schedule;
pub mod scheduler;

pub const SNAPSHOT_VERSION: u32 = 1;

/// Tables in restore order (parents first). Audit log and backup metadata are never restored.
const TABLES: [&str; 4] = ["users", "forms", "form_entries", "settings"];
const SERIAL_TABLES: [&str; 3] = ["users", "forms", "form_entries"];

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub users: Vec<Value>,
    pub forms: Vec<Value>,
    pub form_entries: Vec<Value>,
    pub settings: Vec<Value>,
}

impl Snapshot {
    fn table(&self, name: &str) -> &[Value] {
        match name {
            "users" => &self.users,
            "forms" => &self.forms,
            "form_entries" => &self.form_entries,
            _ => &self.settings,
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(AppError::BadRequest(format!(
                "Unsupported backup version {} (expected {SNAPSHOT_VERSION})",
                self.version
            )));
        }
        let has_admin = self
            .users
            .iter()
            .any(|u| u.get("role").and_then(Value::as_str) == Some("superadmin"));
        if !has_admin {
            return Err(AppError::BadRequest("Backup contains no super-admin user".to_string()));
        }
        Ok(())
    }
}

async fn dump_table(pool: &PgPool, table: &str) -> Result<Vec<Value>, sqlx::Error> {
    let rows: Value = sqlx::query_scalar(&format!(
        "SELECT COALESCE(jsonb_agg(to_jsonb(t)), '[]'::jsonb) FROM {table} t"
    ))
    .fetch_one(pool)
    .await?;
    Ok(match rows {
        Value::Array(items) => items,
        _ => vec![],
    })
}

pub async fn take_snapshot(pool: &PgPool) -> Result<Snapshot, AppError> {
    Ok(Snapshot {
        version: SNAPSHOT_VERSION,
        created_at: Utc::now(),
        users: dump_table(pool, "users").await?,
        forms: dump_table(pool, "forms").await?,
        form_entries: dump_table(pool, "form_entries").await?,
        settings: dump_table(pool, "settings").await?,
    })
}

fn backup_file_name(now: DateTime<Utc>) -> String {
    format!("backup-{}.json", now.format("%Y%m%d-%H%M%S%3f"))
}

/// A stored file name is a bare name we generated; anything else is refused.
pub fn backup_path(dir: &Path, file_name: &str) -> Result<PathBuf, AppError> {
    if file_name.is_empty() || file_name.contains(['/', '\\']) || file_name.starts_with('.') {
        return Err(AppError::BadRequest("Invalid backup file name".to_string()));
    }
    Ok(dir.join(file_name))
}

/// Write a snapshot file and record it.
pub async fn create_backup(pool: &PgPool, dir: &Path, created_by: &str) -> Result<BackupRecord, AppError> {
    let snapshot = take_snapshot(pool).await?;
    let bytes = serde_json::to_vec_pretty(&snapshot)?;
    tokio::fs::create_dir_all(dir).await?;
    let file_name = backup_file_name(snapshot.created_at);
    tokio::fs::write(backup_path(dir, &file_name)?, &bytes).await?;
    let record = backup::insert(pool, &file_name, bytes.len() as i64, created_by).await?;
    log::info!("Backup {} written ({} bytes) by {created_by}", record.file_name, record.size_bytes);
    Ok(record)
}

pub async fn read_snapshot(dir: &Path, record: &BackupRecord) -> Result<Snapshot, AppError> {
    let path = backup_path(dir, &record.file_name)?;
    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::BadRequest(format!("Backup file {} is missing", record.file_name)));
        }
        Err(e) => return Err(e.into()),
    };
    serde_json::from_slice(&bytes)
        .map_err(|e| AppError::BadRequest(format!("Backup file is not a valid snapshot: {e}")))
}

/// Replace users, forms, entries and settings with the snapshot's rows.
/// Runs in one transaction; ids are kept and sequences moved past them.
pub async fn restore_snapshot(pool: &PgPool, snapshot: &Snapshot) -> Result<(), AppError> {
    snapshot.validate()?;
    let mut tx = pool.begin().await?;

    for table in TABLES.iter().rev() {
        sqlx::query(&format!("DELETE FROM {table}")).execute(&mut *tx).await?;
    }
    for table in TABLES {
        sqlx::query(&format!(
            "INSERT INTO {table} SELECT * FROM jsonb_populate_recordset(NULL::{table}, $1)"
        ))
        .bind(Value::Array(snapshot.table(table).to_vec()))
        .execute(&mut *tx)
        .await?;
    }
    for table in SERIAL_TABLES {
        sqlx::query(&format!(
            "SELECT setval(pg_get_serial_sequence('{table}', 'id'), \
                           COALESCE((SELECT MAX(id) FROM {table}), 0) + 1, false)"
        ))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    log::info!(
        "Restored snapshot from {}: {} users, {} forms, {} entries",
        snapshot.created_at,
        snapshot.users.len(),
        snapshot.forms.len(),
        snapshot.form_entries.len()
    );
    Ok(())
}

/// Remove the file (if still there) and its record.
pub async fn delete_backup(pool: &PgPool, dir: &Path, record: &BackupRecord) -> Result<(), AppError> {
    match tokio::fs::remove_file(backup_path(dir, &record.file_name)?).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("Backup file {} was already gone", record.file_name);
        }
        Err(e) => return Err(e.into()),
    }
    backup::delete(pool, record.id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(users: Vec<Value>) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            created_at: Utc::now(),
            users,
            forms: vec![],
            form_entries: vec![],
            settings: vec![],
        }
    }

    #[test]
    fn snapshot_needs_a_super_admin() {
        assert!(snapshot(vec![json!({"id": 1, "role": "l2"})]).validate().is_err());
        assert!(snapshot(vec![json!({"id": 1, "role": "superadmin"})]).validate().is_ok());
    }

    #[test]
    fn unknown_versions_are_refused() {
        let mut s = snapshot(vec![json!({"role": "superadmin"})]);
        s.version = 99;
        assert!(matches!(s.validate(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn paths_stay_inside_the_backup_dir() {
        let dir = Path::new("data/backups");
        assert_eq!(backup_path(dir, "backup-1.json").unwrap(), dir.join("backup-1.json"));
        assert!(backup_path(dir, "../etc/passwd").is_err());
        assert!(backup_path(dir, ".hidden").is_err());
        assert!(backup_path(dir, "").is_err());
    }

    #[test]
    fn file_names_sort_by_time() {
        let a = backup_file_name("2024-01-02T03:04:05.006Z".parse().unwrap());
        assert_eq!(a, "backup-20240102-030405006.json");
    }
}
