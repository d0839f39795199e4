use sqlx::PgPool;
use sqlx::types::Json;

use super::types::{NewUser, Role, User, UserRow, UserUpdate};

const SELECT_USER: &str = "\
    SELECT id, username, nickname, password, role, forms, forms_view, reports, logs, \
           backup_allowed, created_at, updated_at \
    FROM users";

fn convert(rows: Vec<UserRow>) -> Result<Vec<User>, sqlx::Error> {
    rows.into_iter().map(User::try_from).collect()
}

/// All users, optionally restricted to one role, ordered by id.
pub async fn find_all(pool: &PgPool, role: Option<Role>) -> Result<Vec<User>, sqlx::Error> {
    let rows = match role {
        Some(r) => {
            sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE role = $1 ORDER BY id"))
                .bind(r.as_str())
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} ORDER BY id"))
                .fetch_all(pool)
                .await?
        }
    };
    convert(rows)
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(User::try_from).transpose()
}

/// Find user by username for authentication.
pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE username = $1"))
        .bind(username)
        .fetch_optional(pool)
        .await?;
    row.map(User::try_from).transpose()
}

pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users").fetch_one(pool).await
}

/// Users per role, as `(role, count)` pairs.
pub async fn count_by_role(pool: &PgPool) -> Result<Vec<(String, i64)>, sqlx::Error> {
    sqlx::query_as("SELECT role, COUNT(*) FROM users GROUP BY role ORDER BY role")
        .fetch_all(pool)
        .await
}

pub async fn create(pool: &PgPool, new: &NewUser) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO users (username, nickname, password, role, forms, forms_view, reports, logs, backup_allowed) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
    )
    .bind(&new.username)
    .bind(&new.nickname)
    .bind(&new.password)
    .bind(new.role.as_str())
    .bind(Json(&new.forms))
    .bind(Json(&new.forms_view))
    .bind(Json(&new.reports))
    .bind(Json(&new.logs))
    .bind(new.backup_allowed)
    .fetch_one(pool)
    .await
}

/// Apply a partial update. Returns false when the user does not exist.
pub async fn update(pool: &PgPool, id: i64, changes: &UserUpdate) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET \
            username = COALESCE($2, username), \
            nickname = COALESCE($3, nickname), \
            password = COALESCE($4, password), \
            role = COALESCE($5, role), \
            forms = COALESCE($6, forms), \
            forms_view = COALESCE($7, forms_view), \
            reports = COALESCE($8, reports), \
            logs = COALESCE($9, logs), \
            backup_allowed = COALESCE($10, backup_allowed), \
            updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(changes.username.as_deref())
    .bind(changes.nickname.as_deref())
    .bind(changes.password.as_deref())
    .bind(changes.role.map(|r| r.as_str()))
    .bind(changes.forms.as_ref().map(Json))
    .bind(changes.forms_view.as_ref().map(Json))
    .bind(changes.reports.as_ref().map(Json))
    .bind(changes.logs.as_ref().map(Json))
    .bind(changes.backup_allowed)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_backup_allowed(pool: &PgPool, id: i64, allowed: bool) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET backup_allowed = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(allowed)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Drop a deleted form's id from every user's permission lists.
pub async fn remove_form_references(pool: &PgPool, form_id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET \
            forms = forms - $1, \
            forms_view = forms_view - $1, \
            reports = reports - $1, \
            updated_at = NOW() \
         WHERE forms ? $1 OR forms_view ? $1 OR reports ? $1",
    )
    .bind(form_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
