/// Validate a username: 2-50 chars, letters, digits, `_`, `.` and `-` only.
pub fn validate_username(username: &str) -> Option<String> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Some("Username is required".to_string());
    }
    if trimmed.chars().count() < 2 {
        return Some("Username must be at least 2 characters".to_string());
    }
    if trimmed.chars().count() > 50 {
        return Some("Username must be at most 50 characters".to_string());
    }
    if !trimmed.chars().all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-')) {
        return Some("Username may only contain letters, numbers, '_', '.' and '-'".to_string());
    }
    None
}

/// Validate a password: min 8 chars.
pub fn validate_password(password: &str) -> Option<String> {
    if password.is_empty() {
        return Some("Password is required".to_string());
    }
    if password.chars().count() < 8 {
        return Some("Password must be at least 8 characters".to_string());
    }
    if password.len() > 256 {
        return Some("Password must be at most 256 bytes".to_string());
    }
    None
}

/// Validate an optional text field with a max length (empty is OK).
pub fn validate_optional(value: &str, field_name: &str, max_len: usize) -> Option<String> {
    let trimmed = value.trim();
    if !trimmed.is_empty() && trimmed.chars().count() > max_len {
        return Some(format!("{field_name} must be at most {max_len} characters"));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames() {
        assert!(validate_username("operator_1").is_none());
        assert!(validate_username("ali.rezaei").is_none());
        assert!(validate_username("علی").is_none());
        assert!(validate_username(" ").is_some());
        assert!(validate_username("a").is_some());
        assert!(validate_username("bad name").is_some());
        assert!(validate_username(&"x".repeat(51)).is_some());
    }

    #[test]
    fn passwords() {
        assert!(validate_password("admin123").is_none());
        assert!(validate_password("short").is_some());
        assert!(validate_password("").is_some());
    }

    #[test]
    fn optional_fields() {
        assert!(validate_optional("", "Nickname", 5).is_none());
        assert!(validate_optional("abcdef", "Nickname", 5).is_some());
    }
}
