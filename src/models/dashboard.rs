use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::models::user::{self, Role};
use crate::models::{backup, entry, form};

/// Counters for the landing page. Super-admins get the system-wide picture;
/// everyone else sees only their permitted forms, and user/backup figures
/// are omitted when they cannot act on them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub forms: i64,
    pub entries: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users_by_role: Option<BTreeMap<String, i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backups: Option<i64>,
    pub last_backup_at: Option<DateTime<Utc>>,
}

/// `form_ids = None` means every form. `user_roles` limits the per-role
/// user counts; `None` leaves them out.
pub async fn load(
    pool: &PgPool,
    form_ids: Option<&[i64]>,
    user_roles: Option<&[Role]>,
    include_backups: bool,
) -> Result<DashboardStats, sqlx::Error> {
    let (forms, entries) = match form_ids {
        None => (form::count(pool).await?, entry::count(pool).await?),
        Some(ids) => {
            let existing = form::existing_ids(pool, ids).await?;
            let entries = entry::count_for_forms(pool, &existing).await?;
            (existing.len() as i64, entries)
        }
    };

    let users_by_role = match user_roles {
        Some(roles) => Some(
            user::count_by_role(pool)
                .await?
                .into_iter()
                .filter(|(role, _)| roles.iter().any(|r| r.as_str() == role.as_str()))
                .collect(),
        ),
        None => None,
    };

    let (backups, last_backup_at) = if include_backups {
        (Some(backup::count(pool).await?), backup::last_created_at(pool).await?)
    } else {
        (None, None)
    };

    Ok(DashboardStats {
        forms,
        entries,
        users_by_role,
        backups,
        last_backup_at,
    })
}
