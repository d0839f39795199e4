use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

/// The three tiers of the organization. L2 supervises L3 operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    SuperAdmin,
    L2,
    L3,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "superadmin",
            Role::L2 => "l2",
            Role::L3 => "l3",
        }
    }

    /// Case-insensitive parse; clients send both `l3` and `L3`.
    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_ascii_lowercase().as_str() {
            "superadmin" | "super_admin" | "admin" => Some(Role::SuperAdmin),
            "l2" => Some(Role::L2),
            "l3" => Some(Role::L3),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Role::parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("unknown role '{raw}'")))
    }
}

/// Raw row; `role` stays text so an unexpected value surfaces as a decode error we control.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct UserRow {
    pub id: i64,
    pub username: String,
    pub nickname: String,
    pub password: String,
    pub role: String,
    pub forms: Json<Vec<String>>,
    pub forms_view: Json<Vec<String>>,
    pub reports: Json<Vec<String>>,
    pub logs: Json<Vec<String>>,
    pub backup_allowed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Internal user, includes the password hash. Never serialized.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub nickname: String,
    pub password: String,
    pub role: Role,
    pub forms: Vec<String>,
    pub forms_view: Vec<String>,
    pub reports: Vec<String>,
    pub logs: Vec<String>,
    pub backup_allowed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = sqlx::Error;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&row.role).ok_or_else(|| {
            sqlx::Error::Decode(format!("unknown role '{}' for user {}", row.role, row.id).into())
        })?;
        Ok(User {
            id: row.id,
            username: row.username,
            nickname: row.nickname,
            password: row.password,
            role,
            forms: row.forms.0,
            forms_view: row.forms_view.0,
            reports: row.reports.0,
            logs: row.logs.0,
            backup_allowed: row.backup_allowed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Safe version for API responses, no password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDisplay {
    pub id: i64,
    pub username: String,
    pub nickname: String,
    pub role: Role,
    pub forms: Vec<String>,
    #[serde(rename = "forms_view")]
    pub forms_view: Vec<String>,
    pub reports: Vec<String>,
    pub logs: Vec<String>,
    pub backup_allowed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserDisplay {
    fn from(u: User) -> Self {
        UserDisplay {
            id: u.id,
            username: u.username,
            nickname: u.nickname,
            role: u.role,
            forms: u.forms,
            forms_view: u.forms_view,
            reports: u.reports,
            logs: u.logs,
            backup_allowed: u.backup_allowed,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// New user data for creation. `password` is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub nickname: String,
    pub password: String,
    pub role: Role,
    pub forms: Vec<String>,
    pub forms_view: Vec<String>,
    pub reports: Vec<String>,
    pub logs: Vec<String>,
    pub backup_allowed: bool,
}

/// Partial update; `None` leaves the column untouched. `password` is already hashed.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub nickname: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub forms: Option<Vec<String>>,
    pub forms_view: Option<Vec<String>>,
    pub reports: Option<Vec<String>>,
    pub logs: Option<Vec<String>>,
    pub backup_allowed: Option<bool>,
}

/// Create request body.
#[derive(Deserialize, Debug)]
pub struct UserRequest {
    pub username: String,
    #[serde(default)]
    pub nickname: Option<String>,
    pub password: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub forms: Vec<String>,
    #[serde(default, alias = "formsView")]
    pub forms_view: Vec<String>,
    #[serde(default)]
    pub reports: Vec<String>,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default, alias = "backup_allowed")]
    #[serde(rename = "backupAllowed")]
    pub backup_allowed: bool,
}

/// Update request body; every key optional.
#[derive(Deserialize, Debug, Default)]
pub struct UserPatchRequest {
    pub username: Option<String>,
    pub nickname: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub forms: Option<Vec<String>>,
    #[serde(alias = "formsView")]
    pub forms_view: Option<Vec<String>>,
    pub reports: Option<Vec<String>>,
    pub logs: Option<Vec<String>>,
    #[serde(rename = "backupAllowed", alias = "backup_allowed")]
    pub backup_allowed: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_is_case_insensitive() {
        assert_eq!(Role::parse("L3"), Some(Role::L3));
        assert_eq!(Role::parse("l2"), Some(Role::L2));
        assert_eq!(Role::parse("SuperAdmin"), Some(Role::SuperAdmin));
        assert_eq!(Role::parse("l4"), None);
    }

    #[test]
    fn user_request_accepts_client_shape() {
        let body = r#"{
            "username": "operator_1",
            "role": "L3",
            "forms": ["1"],
            "forms_view": ["2"],
            "reports": [],
            "logs": [],
            "backupAllowed": true
        }"#;
        let req: UserRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.role, Role::L3);
        assert_eq!(req.forms_view, vec!["2".to_string()]);
        assert!(req.backup_allowed);
        assert!(req.password.is_none());
    }

    #[test]
    fn unknown_role_is_rejected() {
        let body = r#"{"username": "x1", "role": "guest"}"#;
        assert!(serde_json::from_str::<UserRequest>(body).is_err());
    }
}
