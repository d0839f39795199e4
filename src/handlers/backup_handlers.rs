use actix_files::NamedFile;
use actix_session::Session;
use actix_web::{HttpRequest, HttpResponse, web};
use chrono::Local;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::access;
use crate::auth::session::{current_user, require_superadmin};
use crate::backups::{self, schedule::{BackupSchedule, SCHEDULE_KEY}};
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::user::{self, Role, User};
use crate::models::{backup, setting};

use super::attachment;

async fn backup_user(session: &Session, pool: &PgPool) -> Result<User, AppError> {
    let actor = current_user(session, pool).await?;
    access::ensure(access::can_backup(&actor), "backups")?;
    Ok(actor)
}

/// GET /api/backups - newest first
pub async fn list(pool: web::Data<PgPool>, session: Session) -> Result<HttpResponse, AppError> {
    backup_user(&session, &pool).await?;
    let records = backup::find_all(&pool).await?;
    Ok(HttpResponse::Ok().json(records))
}

/// POST /api/backups
pub async fn create(
    pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let actor = backup_user(&session, &pool).await?;
    let record = backups::create_backup(&pool, &config.backup_dir, &actor.username).await?;

    let details = serde_json::json!({
        "file": record.file_name,
        "size_bytes": record.size_bytes,
        "summary": format!("Created backup {}", record.file_name),
    });
    let _ = crate::audit::log(&pool, actor.id, "backup.created", "backup", record.id, details).await;

    Ok(HttpResponse::Created().json(record))
}

/// GET /api/backups/{id}/download
pub async fn download(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    backup_user(&session, &pool).await?;
    let record = backup::find_by_id(&pool, path.into_inner()).await?.ok_or(AppError::NotFound)?;
    let file_path = backups::backup_path(&config.backup_dir, &record.file_name)?;

    let file = match NamedFile::open_async(&file_path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(AppError::NotFound),
        Err(e) => return Err(e.into()),
    };
    Ok(file
        .set_content_disposition(attachment(&record.file_name))
        .into_response(&req))
}

/// POST /api/backups/{id}/restore - replaces users, forms, entries and settings
pub async fn restore(
    pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let actor = backup_user(&session, &pool).await?;
    let record = backup::find_by_id(&pool, path.into_inner()).await?.ok_or(AppError::NotFound)?;

    let snapshot = backups::read_snapshot(&config.backup_dir, &record).await?;
    backups::restore_snapshot(&pool, &snapshot).await?;

    let details = serde_json::json!({
        "file": record.file_name,
        "users": snapshot.users.len(),
        "forms": snapshot.forms.len(),
        "entries": snapshot.form_entries.len(),
        "summary": format!("Restored backup {}", record.file_name),
    });
    let _ = crate::audit::log(&pool, actor.id, "backup.restored", "backup", record.id, details).await;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Backup restored",
        "users": snapshot.users.len(),
        "forms": snapshot.forms.len(),
        "entries": snapshot.form_entries.len(),
    })))
}

/// DELETE /api/backups/{id}
pub async fn delete(
    pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let actor = backup_user(&session, &pool).await?;
    let record = backup::find_by_id(&pool, path.into_inner()).await?.ok_or(AppError::NotFound)?;
    backups::delete_backup(&pool, &config.backup_dir, &record).await?;

    let details = serde_json::json!({
        "file": record.file_name,
        "summary": format!("Deleted backup {}", record.file_name),
    });
    let _ = crate::audit::log(&pool, actor.id, "backup.deleted", "backup", record.id, details).await;

    Ok(HttpResponse::NoContent().finish())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleView {
    #[serde(flatten)]
    schedule: BackupSchedule,
    next_run: Option<String>,
}

fn schedule_view(schedule: BackupSchedule) -> ScheduleView {
    let next_run = schedule
        .next_run(Local::now().naive_local())
        .map(|t| t.format("%Y-%m-%dT%H:%M").to_string());
    ScheduleView { schedule, next_run }
}

/// GET /api/backups/schedule
pub async fn get_schedule(pool: web::Data<PgPool>, session: Session) -> Result<HttpResponse, AppError> {
    require_superadmin(&session, &pool).await?;
    let schedule = setting::get::<BackupSchedule>(&pool, SCHEDULE_KEY).await?.unwrap_or_default();
    Ok(HttpResponse::Ok().json(schedule_view(schedule)))
}

/// PUT /api/backups/schedule
pub async fn put_schedule(
    pool: web::Data<PgPool>,
    session: Session,
    body: web::Json<BackupSchedule>,
) -> Result<HttpResponse, AppError> {
    let actor = require_superadmin(&session, &pool).await?;
    let mut schedule = body.into_inner();
    schedule.time = schedule.time.trim().to_string();
    schedule.weekday = schedule.weekday.map(|w| w.trim().to_ascii_lowercase()).filter(|w| !w.is_empty());

    let errors = schedule.validate();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    setting::put(&pool, SCHEDULE_KEY, &schedule).await?;

    let details = serde_json::json!({
        "enabled": schedule.enabled,
        "frequency": schedule.frequency,
        "time": schedule.time,
        "summary": "Updated backup schedule",
    });
    let _ = crate::audit::log(&pool, actor.id, "backup.schedule_updated", "setting", 0, details).await;

    Ok(HttpResponse::Ok().json(schedule_view(schedule)))
}

#[derive(Deserialize)]
pub struct PermissionRequest {
    #[serde(rename = "backupAllowed", alias = "backup_allowed")]
    pub backup_allowed: bool,
}

/// PUT /api/backups/permissions/{user_id}
pub async fn set_permission(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<PermissionRequest>,
) -> Result<HttpResponse, AppError> {
    let actor = require_superadmin(&session, &pool).await?;
    let user_id = path.into_inner();

    let target = user::find_by_id(&pool, user_id).await?.ok_or(AppError::NotFound)?;
    if target.role == Role::SuperAdmin {
        return Err(AppError::BadRequest("Super-admins always have backup access".to_string()));
    }
    user::set_backup_allowed(&pool, user_id, body.backup_allowed).await?;

    let verb = if body.backup_allowed { "Granted" } else { "Revoked" };
    let details = serde_json::json!({
        "username": target.username,
        "backup_allowed": body.backup_allowed,
        "summary": format!("{verb} backup access for '{}'", target.username),
    });
    let _ = crate::audit::log(&pool, actor.id, "backup.permission", "user", user_id, details).await;

    let updated = user::find_by_id(&pool, user_id).await?.ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Ok().json(user::UserDisplay::from(updated)))
}
