use actix_session::Session;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::{password, rate_limit::RateLimiter, session};
use crate::errors::{AppError, ApiErrorResponse};
use crate::models::user::{self, UserDisplay};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

fn client_ip(req: &HttpRequest) -> std::net::IpAddr {
    req.peer_addr()
        .map(|addr| addr.ip())
        .unwrap_or(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED))
}

fn rejected(status: actix_web::http::StatusCode, message: &str) -> HttpResponse {
    HttpResponse::build(status).json(ApiErrorResponse {
        message: message.to_string(),
        details: vec![],
    })
}

/// POST /api/auth/login
pub async fn login(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    session: Session,
    body: web::Json<LoginRequest>,
    limiter: web::Data<RateLimiter>,
) -> Result<HttpResponse, AppError> {
    // Rate-limit check BEFORE any database access
    let ip = client_ip(&req);
    if limiter.is_blocked(ip) {
        return Ok(rejected(
            actix_web::http::StatusCode::TOO_MANY_REQUESTS,
            "Too many failed login attempts. Please try again later.",
        ));
    }

    let found = user::find_by_username(&pool, body.username.trim()).await?;
    let verified = match &found {
        Some(u) => password::verify_password(&body.password, &u.password)?,
        None => false,
    };

    match found {
        Some(u) if verified => {
            limiter.clear(ip);
            session::sign_in(&session, &u)?;
            let details = serde_json::json!({
                "summary": format!("'{}' signed in", u.username),
            });
            let _ = crate::audit::log(&pool, u.id, "auth.login", "user", u.id, details).await;
            Ok(HttpResponse::Ok().json(UserDisplay::from(u)))
        }
        _ => {
            limiter.record_failure(ip);
            log::info!("Failed login for '{}' from {ip}", body.username.trim());
            Ok(rejected(
                actix_web::http::StatusCode::UNAUTHORIZED,
                "Invalid username or password",
            ))
        }
    }
}

/// POST /api/auth/logout
pub async fn logout(pool: web::Data<PgPool>, session: Session) -> Result<HttpResponse, AppError> {
    if let Some(user_id) = session::get_user_id(&session) {
        let username = session::get_username(&session).unwrap_or_default();
        let details = serde_json::json!({ "summary": format!("'{username}' signed out") });
        let _ = crate::audit::log(&pool, user_id, "auth.logout", "user", user_id, details).await;
    }
    session::sign_out(&session);
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Signed out" })))
}

/// GET /api/auth/me
pub async fn me(pool: web::Data<PgPool>, session: Session) -> Result<HttpResponse, AppError> {
    let current = session::current_user(&session, &pool).await?;
    Ok(HttpResponse::Ok().json(UserDisplay::from(current)))
}
