use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::{App, HttpResponse, HttpServer, cookie::Key, middleware, web};

use formdesk::auth::rate_limit::RateLimiter;
use formdesk::config::AppConfig;
use formdesk::errors::ApiErrorResponse;
use formdesk::{audit, auth, backups, db, handlers};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            log::error!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    std::fs::create_dir_all(&config.backup_dir)?;

    // Initialize database
    let pool = match db::init_pool(&config.database_url).await {
        Ok(p) => p,
        Err(e) => {
            log::error!("Failed to connect to database: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = db::run_migrations(&pool).await {
        log::error!("{e}");
        std::process::exit(1);
    }

    // Seed the default super-admin if no user exists
    let seeded = match auth::password::hash_password(&config.admin_password) {
        Ok(admin_hash) => db::seed_admin(&pool, &admin_hash).await,
        Err(e) => Err(e),
    };
    if let Err(e) = seeded {
        log::error!("Failed to seed admin user: {e}");
        std::process::exit(1);
    }

    // Clean up old audit entries based on retention policy
    audit::cleanup_old_entries(&pool, config.audit_retention_days).await;

    backups::scheduler::spawn_scheduler(pool.clone(), config.backup_dir.clone());

    // Session encryption key: load from SESSION_KEY for sessions that survive restarts
    let secret_key = match config.session_key_bytes() {
        Some(bytes) => {
            log::info!("Using SESSION_KEY from environment");
            Key::from(bytes.as_slice())
        }
        None if config.session_key.is_some() => {
            log::warn!("SESSION_KEY too short (need 64+ bytes), generating random key");
            Key::generate()
        }
        None => {
            log::warn!("No SESSION_KEY set, generating random key (sessions lost on restart)");
            Key::generate()
        }
    };

    let limiter = web::Data::new(RateLimiter::new());
    let pool_data = web::Data::new(pool);
    let config_data = web::Data::new(config.clone());
    let (host, port) = config.listen_addr();
    log::info!("Starting server at http://{host}:{port}");

    HttpServer::new(move || {
        let session_mw = SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
            .cookie_secure(config_data.cookie_secure)
            .cookie_http_only(true)
            .build();

        App::new()
            .wrap(session_mw)
            .wrap(middleware::Logger::default())
            .app_data(pool_data.clone())
            .app_data(config_data.clone())
            .app_data(limiter.clone())
            .service(actix_files::Files::new("/static", &config_data.assets_dir))
            .configure(handlers::configure)
            // Default 404 handler (must be registered last)
            .default_service(web::to(|| async {
                HttpResponse::NotFound().json(ApiErrorResponse {
                    message: "Not found".to_string(),
                    details: vec![],
                })
            }))
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
