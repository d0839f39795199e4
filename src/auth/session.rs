use actix_session::Session;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::user::{self, Role, User};

const USER_ID: &str = "user_id";
const USERNAME: &str = "username";
const ROLE: &str = "role";

pub fn get_user_id(session: &Session) -> Option<i64> {
    session.get::<i64>(USER_ID).unwrap_or(None)
}

pub fn get_username(session: &Session) -> Option<String> {
    session.get::<String>(USERNAME).unwrap_or(None)
}

/// Start an authenticated session for `user`.
pub fn sign_in(session: &Session, user: &User) -> Result<(), AppError> {
    session.renew();
    session
        .insert(USER_ID, user.id)
        .and_then(|_| session.insert(USERNAME, &user.username))
        .and_then(|_| session.insert(ROLE, user.role.as_str()))
        .map_err(|e| AppError::Session(format!("Failed to store session: {e}")))
}

pub fn sign_out(session: &Session) {
    session.purge();
}

/// The signed-in user, reloaded from the database so permission changes
/// and deletions take effect on the next request.
pub async fn current_user(session: &Session, pool: &PgPool) -> Result<User, AppError> {
    let id = get_user_id(session).ok_or(AppError::Unauthorized)?;
    match user::find_by_id(pool, id).await? {
        Some(u) => Ok(u),
        None => {
            session.purge();
            Err(AppError::Unauthorized)
        }
    }
}

/// Like [`current_user`], but only for super-admins.
pub async fn require_superadmin(session: &Session, pool: &PgPool) -> Result<User, AppError> {
    let u = current_user(session, pool).await?;
    if u.role != Role::SuperAdmin {
        return Err(AppError::PermissionDenied("super-admin only".to_string()));
    }
    Ok(u)
}
