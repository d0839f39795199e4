use actix_session::Session;
use actix_web::{HttpResponse, web};
use sqlx::PgPool;

use crate::auth::access;
use crate::auth::session::current_user;
use crate::errors::AppError;
use crate::models::dashboard;

/// GET /api/dashboard
pub async fn stats(pool: web::Data<PgPool>, session: Session) -> Result<HttpResponse, AppError> {
    let actor = current_user(&session, &pool).await?;
    let form_ids = access::visible_form_ids(&actor);
    let user_roles = access::visible_user_roles(&actor);

    let stats = dashboard::load(
        &pool,
        form_ids.as_deref(),
        user_roles.as_deref(),
        access::can_backup(&actor),
    )
    .await?;
    Ok(HttpResponse::Ok().json(stats))
}
