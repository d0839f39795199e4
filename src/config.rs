use std::path::PathBuf;

/// Runtime configuration, read once at start-up from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub port: u16,
    pub session_key: Option<String>,
    pub backup_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub admin_password: String,
    pub audit_retention_days: i64,
    pub cookie_secure: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Split out so tests don't touch the process env.
    pub fn from_lookup<F>(get: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = get("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| "DATABASE_URL must be set".to_string())?;

        Ok(AppConfig {
            database_url,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or("PORT", get("PORT"), 3000),
            session_key: get("SESSION_KEY"),
            backup_dir: get("BACKUP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/backups")),
            assets_dir: get("ASSETS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static")),
            admin_password: get("ADMIN_PASSWORD").unwrap_or_else(|| "admin123".to_string()),
            audit_retention_days: parse_or("AUDIT_RETENTION_DAYS", get("AUDIT_RETENTION_DAYS"), 365),
            cookie_secure: parse_or("COOKIE_SECURE", get("COOKIE_SECURE"), false),
        })
    }

    pub fn listen_addr(&self) -> (String, u16) {
        (self.bind_addr.clone(), self.port)
    }

    /// Cookie signing key material: hex-encoded or raw, at least 64 bytes either way.
    pub fn session_key_bytes(&self) -> Option<Vec<u8>> {
        let raw = self.session_key.as_deref()?.trim();
        match hex::decode(raw) {
            Ok(bytes) if bytes.len() >= 64 => Some(bytes),
            _ if raw.len() >= 64 => Some(raw.as_bytes().to_vec()),
            _ => None,
        }
    }
}

fn parse_or<T: std::str::FromStr + std::fmt::Display>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        Some(v) => v.trim().parse().unwrap_or_else(|_| {
            log::warn!("Invalid {key}={v:?}, using default {default}");
            default
        }),
        None => default,
    }
}
