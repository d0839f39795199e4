use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::session::current_user;
use crate::auth::{access, password, validate};
use crate::errors::{AppError, is_unique_violation};
use crate::models::form;
use crate::models::user::{self, NewUser, Role, User, UserDisplay, UserPatchRequest, UserRequest, UserUpdate};

#[derive(Deserialize)]
pub struct ListQuery {
    pub role: Option<String>,
}

/// Every id in the permission lists must name an existing form.
async fn check_form_refs(pool: &PgPool, lists: &[(&str, &[String])]) -> Result<Vec<String>, AppError> {
    let mut errors = Vec::new();
    let mut wanted = Vec::new();
    for (name, ids) in lists {
        for raw in ids.iter() {
            match raw.trim().parse::<i64>() {
                Ok(id) => wanted.push((name, raw, id)),
                Err(_) => errors.push(format!("{name}: '{raw}' is not a form id")),
            }
        }
    }
    let ids: Vec<i64> = wanted.iter().map(|(_, _, id)| *id).collect();
    let existing = form::existing_ids(pool, &ids).await?;
    for (name, raw, id) in wanted {
        if !existing.contains(&id) {
            errors.push(format!("{name}: form '{raw}' does not exist"));
        }
    }
    Ok(errors)
}

fn trimmed_ids(ids: Vec<String>) -> Vec<String> {
    ids.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

async fn is_last_superadmin(pool: &PgPool, target: &User) -> Result<bool, AppError> {
    if target.role != Role::SuperAdmin {
        return Ok(false);
    }
    let admins = user::find_all(pool, Some(Role::SuperAdmin)).await?;
    Ok(admins.len() <= 1)
}

async fn load_managed(pool: &PgPool, actor: &User, id: i64) -> Result<User, AppError> {
    access::ensure(access::can_manage_users(actor), "user management")?;
    let target = user::find_by_id(pool, id).await?.ok_or(AppError::NotFound)?;
    access::ensure(access::can_manage_role(actor, target.role), "user outside your tier")?;
    Ok(target)
}

/// GET /api/users?role= - L2 users only ever see L3 users
pub async fn list(
    pool: web::Data<PgPool>,
    session: Session,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    let actor = current_user(&session, &pool).await?;
    access::ensure(access::can_manage_users(&actor), "user management")?;

    let requested = match query.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(raw) => Some(Role::parse(raw).ok_or_else(|| AppError::BadRequest(format!("Unknown role '{raw}'")))?),
        None => None,
    };
    let users = match actor.role {
        Role::SuperAdmin => user::find_all(&pool, requested).await?,
        _ if requested.is_some_and(|r| r != Role::L3) => vec![],
        _ => user::find_all(&pool, Some(Role::L3)).await?,
    };

    let items: Vec<UserDisplay> = users.into_iter().map(UserDisplay::from).collect();
    Ok(HttpResponse::Ok().json(items))
}

/// GET /api/users/{id}
pub async fn read(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let actor = current_user(&session, &pool).await?;
    let id = path.into_inner();
    if id == actor.id {
        return Ok(HttpResponse::Ok().json(UserDisplay::from(actor)));
    }
    let target = load_managed(&pool, &actor, id).await?;
    Ok(HttpResponse::Ok().json(UserDisplay::from(target)))
}

/// POST /api/users
pub async fn create(
    pool: web::Data<PgPool>,
    session: Session,
    body: web::Json<UserRequest>,
) -> Result<HttpResponse, AppError> {
    let actor = current_user(&session, &pool).await?;
    access::ensure(access::can_manage_users(&actor), "user management")?;
    let body = body.into_inner();
    access::ensure(access::can_manage_role(&actor, body.role), "role outside your tier")?;
    let logs = trimmed_ids(body.logs);
    if body.backup_allowed || !logs.is_empty() {
        access::ensure(access::can_grant_privileges(&actor), "backup or log access")?;
    }

    let mut errors = Vec::new();
    errors.extend(validate::validate_username(&body.username));
    match &body.password {
        Some(pwd) => errors.extend(validate::validate_password(pwd)),
        None => errors.push("Password is required".to_string()),
    }
    let nickname = body.nickname.unwrap_or_default().trim().to_string();
    errors.extend(validate::validate_optional(&nickname, "Nickname", 100));

    let forms = trimmed_ids(body.forms);
    let forms_view = trimmed_ids(body.forms_view);
    let reports = trimmed_ids(body.reports);
    errors.extend(
        check_form_refs(
            &pool,
            &[("forms", forms.as_slice()), ("forms_view", forms_view.as_slice()), ("reports", reports.as_slice())],
        )
        .await?,
    );
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let hashed = password::hash_password(body.password.as_deref().unwrap_or_default())?;
    let new_user = NewUser {
        username: body.username.trim().to_string(),
        nickname,
        password: hashed,
        role: body.role,
        forms,
        forms_view,
        reports,
        logs,
        backup_allowed: body.backup_allowed,
    };

    let id = match user::create(&pool, &new_user).await {
        Ok(id) => id,
        Err(e) => {
            let err = AppError::from(e);
            if is_unique_violation(&err) {
                return Err(AppError::BadRequest(format!("Username '{}' is already taken", new_user.username)));
            }
            return Err(err);
        }
    };

    let details = serde_json::json!({
        "username": new_user.username,
        "role": new_user.role.as_str(),
        "summary": format!("Created user '{}' ({})", new_user.username, new_user.role.as_str()),
    });
    let _ = crate::audit::log(&pool, actor.id, "user.created", "user", id, details).await;

    let created = user::find_by_id(&pool, id).await?.ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Created().json(UserDisplay::from(created)))
}

/// PUT /api/users/{id} - partial; the password is re-hashed when present
pub async fn update(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<UserPatchRequest>,
) -> Result<HttpResponse, AppError> {
    let actor = current_user(&session, &pool).await?;
    let id = path.into_inner();
    let target = load_managed(&pool, &actor, id).await?;
    let body = body.into_inner();

    if let Some(role) = body.role {
        access::ensure(access::can_manage_role(&actor, role), "role outside your tier")?;
        if role != target.role {
            if target.id == actor.id {
                return Err(AppError::BadRequest("You cannot change your own role".to_string()));
            }
            if is_last_superadmin(&pool, &target).await? {
                return Err(AppError::BadRequest("Cannot demote the last super-admin".to_string()));
            }
        }
    }

    // Resending the current values is fine; changing them is not.
    let logs = body.logs.map(trimmed_ids);
    let grants_backup = body.backup_allowed.is_some_and(|b| b != target.backup_allowed);
    let grants_logs = logs.as_ref().is_some_and(|l| *l != target.logs);
    if grants_backup || grants_logs {
        access::ensure(access::can_grant_privileges(&actor), "backup or log access")?;
    }

    let mut errors = Vec::new();
    if let Some(name) = &body.username {
        errors.extend(validate::validate_username(name));
    }
    if let Some(pwd) = &body.password {
        errors.extend(validate::validate_password(pwd));
    }
    if let Some(nick) = &body.nickname {
        errors.extend(validate::validate_optional(nick, "Nickname", 100));
    }
    let forms = body.forms.map(trimmed_ids);
    let forms_view = body.forms_view.map(trimmed_ids);
    let reports = body.reports.map(trimmed_ids);
    errors.extend(
        check_form_refs(
            &pool,
            &[
                ("forms", forms.as_deref().unwrap_or_default()),
                ("forms_view", forms_view.as_deref().unwrap_or_default()),
                ("reports", reports.as_deref().unwrap_or_default()),
            ],
        )
        .await?,
    );
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let password = match body.password.as_deref() {
        Some(pwd) => Some(password::hash_password(pwd)?),
        None => None,
    };
    let changes = UserUpdate {
        username: body.username.map(|u| u.trim().to_string()),
        nickname: body.nickname.map(|n| n.trim().to_string()),
        password,
        role: body.role,
        forms,
        forms_view,
        reports,
        logs,
        backup_allowed: body.backup_allowed,
    };

    match user::update(&pool, id, &changes).await {
        Ok(true) => {}
        Ok(false) => return Err(AppError::NotFound),
        Err(e) => {
            let err = AppError::from(e);
            if is_unique_violation(&err) {
                return Err(AppError::BadRequest("Username is already taken".to_string()));
            }
            return Err(err);
        }
    }

    let updated = user::find_by_id(&pool, id).await?.ok_or(AppError::NotFound)?;
    let details = serde_json::json!({
        "username": updated.username,
        "role": updated.role.as_str(),
        "password_changed": changes.password.is_some(),
        "summary": format!("Updated user '{}'", updated.username),
    });
    let _ = crate::audit::log(&pool, actor.id, "user.updated", "user", id, details).await;

    Ok(HttpResponse::Ok().json(UserDisplay::from(updated)))
}

/// DELETE /api/users/{id}
pub async fn delete(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let actor = current_user(&session, &pool).await?;
    let id = path.into_inner();

    // Self-deletion protection
    if id == actor.id {
        return Err(AppError::BadRequest("You cannot delete your own account".to_string()));
    }
    let target = load_managed(&pool, &actor, id).await?;
    if is_last_superadmin(&pool, &target).await? {
        return Err(AppError::BadRequest("Cannot delete the last super-admin".to_string()));
    }

    if !user::delete(&pool, id).await? {
        return Err(AppError::NotFound);
    }

    let details = serde_json::json!({
        "username": target.username,
        "role": target.role.as_str(),
        "summary": format!("Deleted user '{}'", target.username),
    });
    let _ = crate::audit::log(&pool, actor.id, "user.deleted", "user", id, details).await;

    Ok(HttpResponse::NoContent().finish())
}
