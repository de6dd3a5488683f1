// clinic_services/src/accounts/validation.rs

use once_cell::sync::Lazy;
use regex::Regex;

use models::errors::{ValidationError, ValidationResult};

pub const MIN_USERNAME_LEN: usize = 4;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const PASSWORD_SPECIALS: &str = "@#$%^&+=!";

static USERNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9]+$").expect("username pattern is valid"));
static FULL_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z\s.\-]+$").expect("full name pattern is valid"));

pub fn validate_username(username: &str) -> ValidationResult<()> {
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(ValidationError::UsernameTooShort { min: MIN_USERNAME_LEN });
    }
    if !USERNAME_REGEX.is_match(username) {
        return Err(ValidationError::UsernameNotAlphanumeric);
    }
    Ok(())
}

pub fn validate_full_name(full_name: &str) -> ValidationResult<()> {
    if full_name.trim().is_empty() {
        return Err(ValidationError::RequiredField("full name".to_string()));
    }
    if !FULL_NAME_REGEX.is_match(full_name) {
        return Err(ValidationError::InvalidFullName);
    }
    Ok(())
}

/// At least eight characters with an uppercase letter, a digit and one of `@#$%^&+=!`.
pub fn validate_password_strength(password: &str) -> ValidationResult<()> {
    let mut missing = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LEN {
        missing.push(format!("at least {} characters", MIN_PASSWORD_LEN));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        missing.push("an uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        missing.push("a digit".to_string());
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        missing.push(format!("one of {}", PASSWORD_SPECIALS));
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::WeakPassword(format!("needs {}", missing.join(", "))))
    }
}

/// Trims and rejects blank input.
pub fn require_text(field: &str, value: &str) -> ValidationResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::RequiredField(field.to_string()))
    } else {
        Ok(trimmed.to_string())
    }
}
