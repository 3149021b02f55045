//! Registration and palette input checks
//!
//! Each check returns the message shown to the client on failure.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::AddUserRequest;

const USERNAME_LENGTH: std::ops::RangeInclusive<usize> = 3..=32;
const PASSWORD_LENGTH: std::ops::RangeInclusive<usize> = 5..=128;
const MAX_TITLE_LENGTH: usize = 100;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[A-Za-z]{2,}$").expect("email pattern")
    })
}

/// Check a whole sign-up form, field by field, before any store access.
pub fn validate_registration(request: &AddUserRequest) -> Result<(), String> {
    validate_username(&request.username)?;
    validate_email(&request.email)?;
    validate_password(&request.password)
}

/// Usernames are handles shown next to palettes: word characters only.
pub fn validate_username(username: &str) -> Result<(), String> {
    let length = username.chars().count();
    if !USERNAME_LENGTH.contains(&length) {
        return Err(format!(
            "Username must be between {} and {} characters",
            USERNAME_LENGTH.start(),
            USERNAME_LENGTH.end()
        ));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err("Username may only use letters, digits and '_'".to_string());
    }

    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email_pattern().is_match(email) {
        Ok(())
    } else {
        Err(format!("'{email}' is not a valid email address"))
    }
}

pub fn validate_password(password: &str) -> Result<(), String> {
    let length = password.chars().count();
    if PASSWORD_LENGTH.contains(&length) {
        Ok(())
    } else {
        Err(format!(
            "Password must be between {} and {} characters",
            PASSWORD_LENGTH.start(),
            PASSWORD_LENGTH.end()
        ))
    }
}

/// A palette needs a visible, reasonably short title
pub fn validate_title(title: &str) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("Title is required".to_string());
    }

    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(format!(
            "Title must be at most {MAX_TITLE_LENGTH} characters"
        ));
    }

    Ok(())
}
