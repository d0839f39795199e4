//! Shared test infrastructure.
//!
//! Database tests run against `TEST_DATABASE_URL`. When it is unset
//! `setup_test_db()` returns `None` and the test returns early.
//! Every setup truncates all tables, so tests sharing the database are
//! serialized through a process-wide lock.
#![allow(dead_code)]

use std::sync::OnceLock;

use sqlx::PgPool;
use tempfile::TempDir;
use tokio::sync::{Mutex, MutexGuard};

use formdesk::auth::password;
use formdesk::config::AppConfig;
use formdesk::db;
use formdesk::models::form::{self, FormInput};
use formdesk::models::user::{self, NewUser, Role, User};

pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASS: &str = "admin123";
pub const USER_PASS: &str = "Password1!";

static DB_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub struct TestDb {
    pool: PgPool,
    dir: TempDir,
    _guard: MutexGuard<'static, ()>,
}

impl TestDb {
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Scratch directory used as the backup and asset directory.
    pub fn dir(&self) -> &std::path::Path {
        self.dir.path()
    }

    pub fn config(&self) -> AppConfig {
        let dir = self.dir.path().to_string_lossy().to_string();
        AppConfig::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://unused".to_string()),
            "BACKUP_DIR" | "ASSETS_DIR" => Some(dir.clone()),
            _ => None,
        })
        .expect("test config")
    }
}

/// Fresh schema with only the seeded `admin` super-admin.
pub async fn setup_test_db() -> Option<TestDb> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let guard = DB_LOCK.get_or_init(|| Mutex::new(())).lock().await;

    let pool = db::init_pool(&url).await.expect("connect to TEST_DATABASE_URL");
    db::run_migrations(&pool).await.expect("migrations");
    sqlx::query(
        "TRUNCATE audit_log, backups, settings, form_entries, forms, users RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await
    .expect("truncate");

    let admin_hash = password::hash_password(ADMIN_PASS).expect("hash");
    db::seed_admin(&pool, &admin_hash).await.expect("seed admin");

    Some(TestDb {
        pool,
        dir: TempDir::new().expect("temp dir"),
        _guard: guard,
    })
}

pub async fn admin(pool: &PgPool) -> User {
    user::find_by_username(pool, ADMIN_USER)
        .await
        .expect("query")
        .expect("seeded admin")
}

/// Create a user with the given role and form permission lists.
pub async fn create_user(
    pool: &PgPool,
    username: &str,
    role: Role,
    forms: &[i64],
    forms_view: &[i64],
    reports: &[i64],
) -> User {
    let ids = |list: &[i64]| list.iter().map(|id| id.to_string()).collect::<Vec<_>>();
    let new = NewUser {
        username: username.to_string(),
        nickname: String::new(),
        password: password::hash_password(USER_PASS).expect("hash"),
        role,
        forms: ids(forms),
        forms_view: ids(forms_view),
        reports: ids(reports),
        logs: vec![],
        backup_allowed: false,
    };
    let id = user::create(pool, &new).await.expect("create user");
    user::find_by_id(pool, id).await.expect("query").expect("created")
}

pub async fn create_form(pool: &PgPool, input: serde_json::Value) -> form::Form {
    let input: FormInput = serde_json::from_value(input).expect("form json");
    let id = form::create(pool, &input).await.expect("create form");
    form::find_by_id(pool, id).await.expect("query").expect("created")
}

/// Build the full API app for `actix_web::test`.
macro_rules! test_app {
    ($pool:expr, $config:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(
                    actix_session::SessionMiddleware::builder(
                        actix_session::storage::CookieSessionStore::default(),
                        actix_web::cookie::Key::generate(),
                    )
                    .cookie_secure(false)
                    .build(),
                )
                .app_data(actix_web::web::Data::new($pool))
                .app_data(actix_web::web::Data::new($config))
                .app_data(actix_web::web::Data::new(formdesk::auth::rate_limit::RateLimiter::new()))
                .configure(formdesk::handlers::configure),
        )
        .await
    };
}
pub(crate) use test_app;

/// Log in through the API and return the session cookie.
macro_rules! login {
    ($app:expr, $username:expr, $password:expr) => {{
        let req = actix_web::test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(serde_json::json!({ "username": $username, "password": $password }))
            .to_request();
        let resp = actix_web::test::call_service(&$app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::OK, "login as {}", $username);
        resp.response()
            .cookies()
            .next()
            .expect("session cookie")
            .into_owned()
    }};
}
pub(crate) use login;
