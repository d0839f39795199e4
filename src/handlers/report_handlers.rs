use actix_session::Session;
use actix_web::{HttpResponse, web};
use chrono::Local;
use sqlx::PgPool;

use crate::auth::access;
use crate::auth::session::current_user;
use crate::errors::AppError;
use crate::models::report::{self, ReportRequest};
use crate::models::{entry, form};

/// POST /api/reports - filter entries of one form or every permitted form
pub async fn run(
    pool: web::Data<PgPool>,
    session: Session,
    body: web::Json<ReportRequest>,
) -> Result<HttpResponse, AppError> {
    let actor = current_user(&session, &pool).await?;
    let allowed = access::report_form_ids(&actor);
    if let Some(ids) = &allowed {
        access::ensure(!ids.is_empty(), "reports")?;
    }

    let errors = body.filter.validate();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let forms = match body.form_id {
        Some(id) => {
            access::ensure(access::can_report_on(&actor, id), "reports on this form")?;
            vec![form::find_by_id(&pool, id).await?.ok_or(AppError::NotFound)?]
        }
        None => match &allowed {
            None => form::find_all(&pool).await?,
            Some(ids) => form::find_by_ids(&pool, ids).await?,
        },
    };
    let ids: Vec<i64> = forms.iter().map(|f| f.id).collect();
    let entries = entry::list_by_forms(&pool, &ids).await?;

    let result = report::build_report(&forms, entries, &body, Local::now().date_naive());
    Ok(HttpResponse::Ok().json(result))
}
