//! Form-level input checks, run before anything is sent to the backend.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ValidationError;

const PASSWORD_MIN: usize = 8;
const CAPTION_MAX: usize = 2200;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex compiles")
});

static HANDLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@?[a-z0-9_.]{3,30}$").expect("handle regex compiles")
});

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() {
        return Err(ValidationError::EmptyField("email"));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

pub fn validate_password(password: &str, confirm: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password"));
    }
    if password.len() < PASSWORD_MIN {
        return Err(ValidationError::PasswordTooShort);
    }
    if password != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

/// Handles are lowercase alphanumerics plus `_` and `.`, 3 to 30 chars,
/// with or without the leading `@`.
pub fn validate_handle(handle: &str) -> Result<(), ValidationError> {
    if handle.trim().is_empty() {
        return Err(ValidationError::EmptyField("handle"));
    }
    if !HANDLE_RE.is_match(handle) {
        return Err(ValidationError::InvalidHandle);
    }
    Ok(())
}

pub fn validate_caption(caption: &str) -> Result<(), ValidationError> {
    if caption.trim().is_empty() {
        return Err(ValidationError::EmptyField("caption"));
    }
    if caption.chars().count() > CAPTION_MAX {
        return Err(ValidationError::CaptionTooLong);
    }
    Ok(())
}
