pub mod auth_handlers;
pub mod backup_handlers;
pub mod dashboard;
pub mod entry_handlers;
pub mod export_handlers;
pub mod form_handlers;
pub mod log_handlers;
pub mod report_handlers;
pub mod user_handlers;

use actix_web::http::header::{Charset, ContentDisposition, DispositionParam, DispositionType, ExtendedValue};
use actix_web::{middleware, web};

use crate::auth::middleware::{require_auth, require_json};
use crate::errors::AppError;

/// `attachment` disposition with an ASCII fallback name and the UTF-8 original.
pub(crate) fn attachment(file_name: &str) -> ContentDisposition {
    let ascii: String = file_name
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .collect();
    ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![
            DispositionParam::Filename(ascii),
            DispositionParam::FilenameExt(ExtendedValue {
                charset: Charset::Ext("UTF-8".to_string()),
                language_tag: None,
                value: file_name.as_bytes().to_vec(),
            }),
        ],
    }
}

fn bad_request(what: &str, err: impl std::fmt::Display) -> actix_web::Error {
    AppError::BadRequest(format!("Invalid {what}: {err}")).into()
}

/// Mount the JSON API. Everything except login sits behind `require_auth`.
/// Extractor failures answer with the same JSON error body as handlers.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| bad_request("request body", err)))
        .app_data(web::QueryConfig::default().error_handler(|err, _| bad_request("query string", err)))
        .app_data(web::PathConfig::default().error_handler(|err, _| bad_request("path", err)));
    cfg.service(
        web::scope("/api")
            .wrap(middleware::from_fn(require_json))
            .route("/auth/login", web::post().to(auth_handlers::login))
            .service(
                web::scope("")
                    .wrap(middleware::from_fn(require_auth))
                    .route("/auth/logout", web::post().to(auth_handlers::logout))
                    .route("/auth/me", web::get().to(auth_handlers::me))
                    .route("/dashboard", web::get().to(dashboard::stats))
                    // Forms and their entries
                    .route("/forms", web::get().to(form_handlers::list))
                    .route("/forms", web::post().to(form_handlers::create))
                    .route("/forms/{id}", web::get().to(form_handlers::read))
                    .route("/forms/{id}", web::put().to(form_handlers::update))
                    .route("/forms/{id}", web::delete().to(form_handlers::delete))
                    .route("/forms/{id}/entries", web::get().to(entry_handlers::list))
                    .route("/forms/{id}/entries", web::post().to(entry_handlers::create))
                    .route("/forms/{id}/entries/{entry_id}", web::get().to(entry_handlers::read))
                    .route("/forms/{id}/entries/{entry_id}", web::put().to(entry_handlers::update))
                    .route("/forms/{id}/entries/{entry_id}", web::delete().to(entry_handlers::delete))
                    .route("/forms/{id}/lookup", web::get().to(entry_handlers::lookup))
                    .route("/forms/{id}/export/{format}", web::post().to(export_handlers::export))
                    // Users
                    .route("/users", web::get().to(user_handlers::list))
                    .route("/users", web::post().to(user_handlers::create))
                    .route("/users/{id}", web::get().to(user_handlers::read))
                    .route("/users/{id}", web::put().to(user_handlers::update))
                    .route("/users/{id}", web::delete().to(user_handlers::delete))
                    // Backups: fixed paths BEFORE /backups/{id}
                    .route("/backups", web::get().to(backup_handlers::list))
                    .route("/backups", web::post().to(backup_handlers::create))
                    .route("/backups/schedule", web::get().to(backup_handlers::get_schedule))
                    .route("/backups/schedule", web::put().to(backup_handlers::put_schedule))
                    .route("/backups/permissions/{user_id}", web::put().to(backup_handlers::set_permission))
                    .route("/backups/{id}/download", web::get().to(backup_handlers::download))
                    .route("/backups/{id}/restore", web::post().to(backup_handlers::restore))
                    .route("/backups/{id}", web::delete().to(backup_handlers::delete))
                    // Audit log
                    .route("/logs", web::get().to(log_handlers::list))
                    .route("/logs/export", web::get().to(log_handlers::export))
                    .route("/logs", web::delete().to(log_handlers::clear))
                    .route("/reports", web::post().to(report_handlers::run)),
            ),
    );
}
