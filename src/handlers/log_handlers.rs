use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::PgPool;

use crate::audit::action_category;
use crate::auth::access;
use crate::auth::session::{current_user, require_superadmin};
use crate::errors::AppError;
use crate::export::csv::escape;
use crate::models::audit::{self, AuditEntry, AuditFilter};

use super::attachment;

#[derive(Deserialize, Default)]
pub struct LogQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    pub action: Option<String>,
}

/// Build the filter for the actor, refusing actions outside their categories.
async fn scoped_filter(pool: &PgPool, session: &Session, query: &LogQuery) -> Result<AuditFilter, AppError> {
    let actor = current_user(session, pool).await?;
    let categories = access::visible_log_categories(&actor);
    if let Some(allowed) = &categories {
        access::ensure(!allowed.is_empty(), "audit log")?;
        if let Some(action) = query.action.as_deref().map(str::trim).filter(|a| !a.is_empty() && *a != "all") {
            let category = action_category(action);
            access::ensure(allowed.iter().any(|c| c == category), "log category")?;
        }
    }
    Ok(AuditFilter {
        search: query.search.clone(),
        action: query.action.clone(),
        categories,
    })
}

/// GET /api/logs?page=&per_page=&search=&action=
pub async fn list(
    pool: web::Data<PgPool>,
    session: Session,
    query: web::Query<LogQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = scoped_filter(&pool, &session, &query).await?;
    let page = audit::find_paginated(
        &pool,
        &filter,
        query.page.unwrap_or(1),
        query.per_page.unwrap_or(25),
    )
    .await?;
    Ok(HttpResponse::Ok().json(page))
}

fn to_csv(entries: &[AuditEntry]) -> String {
    let mut out = String::from("id,createdAt,username,action,targetType,targetId,summary\r\n");
    for e in entries {
        let line = [
            e.id.to_string(),
            e.created_at.to_rfc3339(),
            e.username.clone(),
            e.action.clone(),
            e.target_type.clone(),
            e.target_id.to_string(),
            e.summary.clone(),
        ]
        .iter()
        .map(|v| escape(v))
        .collect::<Vec<_>>()
        .join(",");
        out.push_str(&line);
        out.push_str("\r\n");
    }
    out
}

/// GET /api/logs/export - same filters as the list, every page
pub async fn export(
    pool: web::Data<PgPool>,
    session: Session,
    query: web::Query<LogQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = scoped_filter(&pool, &session, &query).await?;
    let entries = audit::find_all(&pool, &filter).await?;
    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header(attachment("audit-log.csv"))
        .body(to_csv(&entries)))
}

/// DELETE /api/logs
pub async fn clear(pool: web::Data<PgPool>, session: Session) -> Result<HttpResponse, AppError> {
    let actor = require_superadmin(&session, &pool).await?;
    let removed = audit::clear(&pool).await?;

    let details = serde_json::json!({
        "removed": removed,
        "summary": format!("Cleared {removed} log entries"),
    });
    let _ = crate::audit::log(&pool, actor.id, "log.cleared", "audit_log", 0, details).await;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "removed": removed })))
}
