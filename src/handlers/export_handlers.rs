use actix_session::Session;
use actix_web::{HttpResponse, web};
use sqlx::PgPool;

use crate::auth::access;
use crate::auth::session::current_user;
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::export::{self, ExportFormat, ExportOptions};
use crate::models::{entry, form};

use super::attachment;

/// POST /api/forms/{id}/export/{format} - format is xlsx, csv, html or pdf
pub async fn export(
    pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    session: Session,
    path: web::Path<(i64, String)>,
    body: Option<web::Json<ExportOptions>>,
) -> Result<HttpResponse, AppError> {
    let (form_id, format) = path.into_inner();
    let format = ExportFormat::parse(&format)
        .ok_or_else(|| AppError::BadRequest(format!("Unsupported export format '{format}'")))?;

    let actor = current_user(&session, &pool).await?;
    access::ensure(access::can_view_form(&actor, form_id), "form not shared with you")?;
    let form = form::find_by_id(&pool, form_id).await?.ok_or(AppError::NotFound)?;

    let opts = body.map(web::Json::into_inner).unwrap_or_default();
    let targets = opts.select_targets(entry::list_by_form(&pool, form_id).await?)?;
    let file = export::render(&form, &targets, &opts, format, &config.assets_dir)?;

    let details = serde_json::json!({
        "form": form.name,
        "format": format.as_str(),
        "rows": targets.len(),
        "summary": format!("Exported {} rows of '{}' as {}", targets.len(), form.name, format.as_str()),
    });
    let _ = crate::audit::log(&pool, actor.id, "export.entries", "form", form_id, details).await;

    Ok(HttpResponse::Ok()
        .content_type(file.content_type)
        .insert_header(attachment(&file.file_name))
        .body(file.body))
}
