//! Input validation shared by the user and blog handlers

use regex::Regex;
use std::sync::OnceLock;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_TITLE_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("Please provide a valid email")]
    InvalidEmail,
    #[error("Password must be between {MIN_PASSWORD_LEN} and {MAX_PASSWORD_LEN} characters")]
    PasswordLength,
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("Please provide a valid phone number")]
    InvalidPhoneNumber,
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
    })
}

fn phone_regex() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| {
        Regex::new(r"^\+?[0-9 ()-]{6,20}$").expect("phone pattern is valid")
    })
}

/// Trim and require a non-empty value
pub fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, ValidationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::Missing(field)),
    }
}

/// Validate an email address and return its normalized (lowercase) form
pub fn normalize_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim().to_lowercase();
    if email_regex().is_match(&email) {
        Ok(email)
    } else {
        Err(ValidationError::InvalidEmail)
    }
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if (MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        Ok(())
    } else {
        Err(ValidationError::PasswordLength)
    }
}

pub fn validate_full_name(name: &str) -> Result<String, ValidationError> {
    let name = required(Some(name), "Full name")?;
    max_len(name, "Full name", MAX_NAME_LEN)?;
    Ok(name.to_string())
}

/// Empty phone numbers are treated as absent
pub fn normalize_phone_number(phone: Option<&str>) -> Result<Option<String>, ValidationError> {
    match phone.map(str::trim) {
        None | Some("") => Ok(None),
        Some(p) if phone_regex().is_match(p) => Ok(Some(p.to_string())),
        Some(_) => Err(ValidationError::InvalidPhoneNumber),
    }
}

pub fn validate_title(title: &str) -> Result<String, ValidationError> {
    let title = required(Some(title), "Title")?;
    max_len(title, "Title", MAX_TITLE_LEN)?;
    Ok(title.to_string())
}

pub fn validate_body(body: &str) -> Result<String, ValidationError> {
    Ok(required(Some(body), "Body")?.to_string())
}

fn max_len(value: &str, field: &'static str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        Err(ValidationError::TooLong { field, max })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_normalization() {
        assert_eq!(normalize_email("  Ada@Example.COM ").unwrap(), "ada@example.com");
        assert_eq!(normalize_email("not-an-email"), Err(ValidationError::InvalidEmail));
        assert_eq!(normalize_email("a@b"), Err(ValidationError::InvalidEmail));
        assert_eq!(normalize_email("a b@c.d"), Err(ValidationError::InvalidEmail));
    }

    #[test]
    fn test_password_length() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
        assert!(validate_password(&"x".repeat(MAX_PASSWORD_LEN + 1)).is_err());
    }

    #[test]
    fn test_required() {
        assert_eq!(required(None, "Email"), Err(ValidationError::Missing("Email")));
        assert_eq!(required(Some("   "), "Email"), Err(ValidationError::Missing("Email")));
        assert_eq!(required(Some(" x "), "Email"), Ok("x"));
    }

    #[test]
    fn test_phone_number() {
        assert_eq!(normalize_phone_number(None).unwrap(), None);
        assert_eq!(normalize_phone_number(Some("")).unwrap(), None);
        assert_eq!(
            normalize_phone_number(Some("+1 (555) 010-9999")).unwrap(),
            Some("+1 (555) 010-9999".to_string())
        );
        assert!(normalize_phone_number(Some("call me")).is_err());
    }

    #[test]
    fn test_title_limits() {
        assert!(validate_title("").is_err());
        assert_eq!(validate_title(" Hello ").unwrap(), "Hello");
        assert!(validate_title(&"t".repeat(MAX_TITLE_LEN + 1)).is_err());
    }
}
