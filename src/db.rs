use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::errors::AppError;
use crate::models::user::{self, NewUser, Role};

pub type DbPool = PgPool;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub async fn init_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(8)
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &DbPool) -> Result<(), AppError> {
    MIGRATOR.run(pool).await?;
    log::info!("Database migrations complete");
    Ok(())
}

/// Create the default super-admin when no user exists yet.
pub async fn seed_admin(pool: &DbPool, admin_password_hash: &str) -> Result<(), AppError> {
    let count = user::count(pool).await?;
    if count > 0 {
        log::info!("Database already has {count} users, skipping admin seed");
        return Ok(());
    }

    let admin = NewUser {
        username: "admin".to_string(),
        nickname: "Administrator".to_string(),
        password: admin_password_hash.to_string(),
        role: Role::SuperAdmin,
        forms: vec![],
        forms_view: vec![],
        reports: vec![],
        logs: vec![],
        backup_allowed: true,
    };
    user::create(pool, &admin).await?;
    log::info!("Seeded default super-admin 'admin'");
    Ok(())
}
