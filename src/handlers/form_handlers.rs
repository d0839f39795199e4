use actix_session::Session;
use actix_web::{HttpResponse, web};
use sqlx::PgPool;

use crate::auth::access;
use crate::auth::session::{current_user, require_superadmin};
use crate::errors::AppError;
use crate::models::form::{self, FormInput, FormPatch, schema};
use crate::models::user;

fn checked(mut input: FormInput) -> Result<FormInput, AppError> {
    schema::normalize_definition(&mut input);
    let errors = schema::validate_definition(&input);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    Ok(input)
}

/// GET /api/forms
pub async fn list(pool: web::Data<PgPool>, session: Session) -> Result<HttpResponse, AppError> {
    let actor = current_user(&session, &pool).await?;
    let forms = match access::visible_form_ids(&actor) {
        None => form::find_all(&pool).await?,
        Some(ids) => form::find_by_ids(&pool, &ids).await?,
    };
    Ok(HttpResponse::Ok().json(forms))
}

/// GET /api/forms/{id}
pub async fn read(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let actor = current_user(&session, &pool).await?;
    access::ensure(access::can_view_form(&actor, id), "form not shared with you")?;

    let found = form::find_by_id(&pool, id).await?.ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Ok().json(found))
}

/// POST /api/forms
pub async fn create(
    pool: web::Data<PgPool>,
    session: Session,
    body: web::Json<FormInput>,
) -> Result<HttpResponse, AppError> {
    let actor = require_superadmin(&session, &pool).await?;
    let input = checked(body.into_inner())?;

    let id = form::create(&pool, &input).await?;
    let created = form::find_by_id(&pool, id).await?.ok_or(AppError::NotFound)?;

    let details = serde_json::json!({
        "name": created.name,
        "fields": created.fields.len(),
        "categories": created.categories.len(),
        "summary": format!("Created form '{}'", created.name),
    });
    let _ = crate::audit::log(&pool, actor.id, "form.created", "form", id, details).await;

    Ok(HttpResponse::Created().json(created))
}

/// PUT /api/forms/{id} - only the keys present in the body change
pub async fn update(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<FormPatch>,
) -> Result<HttpResponse, AppError> {
    let actor = require_superadmin(&session, &pool).await?;
    let id = path.into_inner();

    let current = form::find_by_id(&pool, id).await?.ok_or(AppError::NotFound)?;
    let input = checked(body.apply_to(&current))?;

    if !form::update(&pool, id, &input).await? {
        return Err(AppError::NotFound);
    }
    let updated = form::find_by_id(&pool, id).await?.ok_or(AppError::NotFound)?;

    let details = serde_json::json!({
        "name": updated.name,
        "previous_name": current.name,
        "summary": format!("Updated form '{}'", updated.name),
    });
    let _ = crate::audit::log(&pool, actor.id, "form.updated", "form", id, details).await;

    Ok(HttpResponse::Ok().json(updated))
}

/// DELETE /api/forms/{id} - entries go with it
pub async fn delete(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let actor = require_superadmin(&session, &pool).await?;
    let id = path.into_inner();

    let existing = form::find_by_id(&pool, id).await?.ok_or(AppError::NotFound)?;
    if !form::delete(&pool, id).await? {
        return Err(AppError::NotFound);
    }
    let detached = user::remove_form_references(&pool, &id.to_string()).await?;

    let details = serde_json::json!({
        "name": existing.name,
        "users_updated": detached,
        "summary": format!("Deleted form '{}'", existing.name),
    });
    let _ = crate::audit::log(&pool, actor.id, "form.deleted", "form", id, details).await;

    Ok(HttpResponse::NoContent().finish())
}
