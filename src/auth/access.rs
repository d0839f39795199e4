//! Role and per-form permission rules.
//!
//! Super-admins can do everything. Other users act on the forms listed in
//! their permission lists: `forms` (edit entries), `forms_view` (read only),
//! `reports` (report access) and `logs` (visible log categories, L2 only).

use crate::errors::AppError;
use crate::models::user::{Role, User};

fn listed(list: &[String], form_id: i64) -> bool {
    list.iter().any(|id| id.trim().parse::<i64>().ok() == Some(form_id))
}

fn ids(list: &[String]) -> Vec<i64> {
    list.iter().filter_map(|id| id.trim().parse::<i64>().ok()).collect()
}

pub fn is_superadmin(user: &User) -> bool {
    user.role == Role::SuperAdmin
}

pub fn can_view_form(user: &User, form_id: i64) -> bool {
    is_superadmin(user) || listed(&user.forms, form_id) || listed(&user.forms_view, form_id)
}

pub fn can_edit_entries(user: &User, form_id: i64) -> bool {
    is_superadmin(user) || listed(&user.forms, form_id)
}

pub fn can_report_on(user: &User, form_id: i64) -> bool {
    is_superadmin(user) || listed(&user.reports, form_id)
}

/// Form ids a user may see; `None` means every form.
pub fn visible_form_ids(user: &User) -> Option<Vec<i64>> {
    if is_superadmin(user) {
        return None;
    }
    let mut out = ids(&user.forms);
    for id in ids(&user.forms_view) {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    Some(out)
}

/// Form ids a user may report on; `None` means every form.
pub fn report_form_ids(user: &User) -> Option<Vec<i64>> {
    (!is_superadmin(user)).then(|| ids(&user.reports))
}

/// Who may create, edit or delete whom: super-admins manage everyone,
/// L2 manages L3, L3 manages nobody.
pub fn can_manage_role(actor: &User, target: Role) -> bool {
    match actor.role {
        Role::SuperAdmin => true,
        Role::L2 => target == Role::L3,
        Role::L3 => false,
    }
}

pub fn can_manage_users(actor: &User) -> bool {
    actor.role != Role::L3
}

/// Roles whose users an actor may see; `None` when they manage nobody.
pub fn visible_user_roles(actor: &User) -> Option<Vec<Role>> {
    match actor.role {
        Role::SuperAdmin => Some(vec![Role::SuperAdmin, Role::L2, Role::L3]),
        Role::L2 => Some(vec![Role::L3]),
        Role::L3 => None,
    }
}

/// Backup access and log categories are granted by super-admins only.
pub fn can_grant_privileges(actor: &User) -> bool {
    is_superadmin(actor)
}

pub fn can_backup(user: &User) -> bool {
    is_superadmin(user) || user.backup_allowed
}

/// Log categories a user may read. `None` means all, `Some(empty)` means none.
pub fn visible_log_categories(user: &User) -> Option<Vec<String>> {
    match user.role {
        Role::SuperAdmin => None,
        Role::L2 => Some(
            user.logs
                .iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
        ),
        Role::L3 => Some(vec![]),
    }
}

pub fn ensure(allowed: bool, what: &str) -> Result<(), AppError> {
    if allowed {
        Ok(())
    } else {
        Err(AppError::PermissionDenied(what.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(role: Role) -> User {
        User {
            id: 7,
            username: "u".into(),
            nickname: String::new(),
            password: String::new(),
            role,
            forms: vec!["1".into()],
            forms_view: vec!["2".into(), "x".into()],
            reports: vec!["3".into()],
            logs: vec!["form".into(), " ".into()],
            backup_allowed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn form_access_follows_lists() {
        let l3 = user(Role::L3);
        assert!(can_view_form(&l3, 1));
        assert!(can_view_form(&l3, 2));
        assert!(!can_view_form(&l3, 3));
        assert!(can_edit_entries(&l3, 1));
        assert!(!can_edit_entries(&l3, 2));
        assert!(can_report_on(&l3, 3));
        assert_eq!(visible_form_ids(&l3), Some(vec![1, 2]));
        assert_eq!(report_form_ids(&l3), Some(vec![3]));

        let admin = user(Role::SuperAdmin);
        assert!(can_edit_entries(&admin, 99));
        assert_eq!(visible_form_ids(&admin), None);
    }

    #[test]
    fn user_management_hierarchy() {
        assert!(can_manage_role(&user(Role::SuperAdmin), Role::L2));
        assert!(can_manage_role(&user(Role::L2), Role::L3));
        assert!(!can_manage_role(&user(Role::L2), Role::L2));
        assert!(!can_manage_role(&user(Role::L2), Role::SuperAdmin));
        assert!(!can_manage_role(&user(Role::L3), Role::L3));
        assert!(!can_manage_users(&user(Role::L3)));
        assert_eq!(visible_user_roles(&user(Role::L2)), Some(vec![Role::L3]));
        assert_eq!(visible_user_roles(&user(Role::L3)), None);
    }

    #[test]
    fn backup_and_log_access() {
        let mut l2 = user(Role::L2);
        assert!(!can_backup(&l2));
        l2.backup_allowed = true;
        assert!(can_backup(&l2));
        assert_eq!(visible_log_categories(&l2), Some(vec!["form".to_string()]));
        assert_eq!(visible_log_categories(&user(Role::L3)), Some(vec![]));
        assert_eq!(visible_log_categories(&user(Role::SuperAdmin)), None);
    }

    #[test]
    fn only_superadmins_grant_privileges() {
        assert!(can_grant_privileges(&user(Role::SuperAdmin)));
        assert!(!can_grant_privileges(&user(Role::L2)));
        assert!(!can_grant_privileges(&user(Role::L3)));
    }
}
