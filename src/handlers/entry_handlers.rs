use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::access;
use crate::auth::session::current_user;
use crate::errors::AppError;
use crate::models::entry::{self, EntryInput, SavedEntry, lookup, values};
use crate::models::form::{self, Form};
use crate::models::user::User;

/// Load a form the actor may read (or edit, when `edit` is set).
async fn form_for(pool: &PgPool, actor: &User, form_id: i64, edit: bool) -> Result<Form, AppError> {
    let allowed = if edit {
        access::can_edit_entries(actor, form_id)
    } else {
        access::can_view_form(actor, form_id)
    };
    access::ensure(allowed, if edit { "form is read-only for you" } else { "form not shared with you" })?;
    form::find_by_id(pool, form_id).await?.ok_or(AppError::NotFound)
}

/// GET /api/forms/{id}/entries - oldest first
pub async fn list(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let form_id = path.into_inner();
    let actor = current_user(&session, &pool).await?;
    form_for(&pool, &actor, form_id, false).await?;

    let entries = entry::list_by_form(&pool, form_id).await?;
    Ok(HttpResponse::Ok().json(entries))
}

/// GET /api/forms/{id}/entries/{entry_id}
pub async fn read(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
    let (form_id, entry_id) = path.into_inner();
    let actor = current_user(&session, &pool).await?;
    form_for(&pool, &actor, form_id, false).await?;

    let found = entry::find(&pool, form_id, entry_id).await?.ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Ok().json(found))
}

/// POST /api/forms/{id}/entries
pub async fn create(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<EntryInput>,
) -> Result<HttpResponse, AppError> {
    let form_id = path.into_inner();
    let actor = current_user(&session, &pool).await?;
    let form = form_for(&pool, &actor, form_id, true).await?;

    let clean = values::normalize_entry(&form, &body).map_err(AppError::Validation)?;
    let flags = lookup::check_references(&pool, &form, &clean, None).await?;
    let created = entry::create(&pool, form_id, &clean).await?;

    let details = serde_json::json!({
        "form": form.name,
        "form_id": form_id,
        "duplicates": flags.len(),
        "summary": format!("Added entry #{} to '{}'", created.id, form.name),
    });
    let _ = crate::audit::log(&pool, actor.id, "entry.created", "entry", created.id, details).await;

    Ok(HttpResponse::Created().json(SavedEntry { entry: created, flags }))
}

/// PUT /api/forms/{id}/entries/{entry_id} - replaces data and sub-rows
pub async fn update(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<(i64, i64)>,
    body: web::Json<EntryInput>,
) -> Result<HttpResponse, AppError> {
    let (form_id, entry_id) = path.into_inner();
    let actor = current_user(&session, &pool).await?;
    let form = form_for(&pool, &actor, form_id, true).await?;
    entry::find(&pool, form_id, entry_id).await?.ok_or(AppError::NotFound)?;

    let clean = values::normalize_entry(&form, &body).map_err(AppError::Validation)?;
    let flags = lookup::check_references(&pool, &form, &clean, Some(entry_id)).await?;
    let updated = entry::update(&pool, form_id, entry_id, &clean)
        .await?
        .ok_or(AppError::NotFound)?;

    let details = serde_json::json!({
        "form": form.name,
        "form_id": form_id,
        "duplicates": flags.len(),
        "summary": format!("Updated entry #{entry_id} of '{}'", form.name),
    });
    let _ = crate::audit::log(&pool, actor.id, "entry.updated", "entry", entry_id, details).await;

    Ok(HttpResponse::Ok().json(SavedEntry { entry: updated, flags }))
}

/// DELETE /api/forms/{id}/entries/{entry_id}
pub async fn delete(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
    let (form_id, entry_id) = path.into_inner();
    let actor = current_user(&session, &pool).await?;
    let form = form_for(&pool, &actor, form_id, true).await?;

    if !entry::delete(&pool, form_id, entry_id).await? {
        return Err(AppError::NotFound);
    }

    let details = serde_json::json!({
        "form": form.name,
        "form_id": form_id,
        "summary": format!("Deleted entry #{entry_id} of '{}'", form.name),
    });
    let _ = crate::audit::log(&pool, actor.id, "entry.deleted", "entry", entry_id, details).await;

    Ok(HttpResponse::NoContent().finish())
}

#[derive(Deserialize)]
pub struct LookupQuery {
    pub field: String,
    pub value: String,
}

/// GET /api/forms/{id}/lookup?field=&value= - source entry data for auto-fill
pub async fn lookup(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    query: web::Query<LookupQuery>,
) -> Result<HttpResponse, AppError> {
    let form_id = path.into_inner();
    let actor = current_user(&session, &pool).await?;
    let form = form_for(&pool, &actor, form_id, false).await?;

    let value = query.value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest("value is required".to_string()));
    }
    let (target, source) = lookup::lookup_target(&form, query.field.trim())?;
    access::ensure(access::can_view_form(&actor, target), "referenced form")?;
    let data = lookup::resolve(&pool, target, source, value).await?;
    Ok(HttpResponse::Ok().json(data))
}
