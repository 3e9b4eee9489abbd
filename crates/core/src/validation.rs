//! Client-side form validation
//!
//! Mirrors the constraints the identity service enforces so a form can be
//! rejected before any request is made. Messages match the service's
//! `fieldErrors` wording so views render both sources the same way.

use crate::types::{FieldErrors, LoginRequest, RegisterRequest};

/// Minimum password length accepted at registration
pub const MIN_PASSWORD_LEN: usize = 8;

/// Validate a login form
///
/// # Errors
///
/// Returns the per-field messages when any field is blank
pub fn validate_login(request: &LoginRequest) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    check(&mut errors, "email", validators::not_blank(&request.email));
    check(&mut errors, "password", validators::not_blank(&request.password));
    finish(errors)
}

/// Validate a registration form
///
/// # Errors
///
/// Returns the per-field messages for every invalid field
pub fn validate_register(request: &RegisterRequest) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    check(
        &mut errors,
        "email",
        validators::not_blank(&request.email).or_else(|| validators::email(&request.email)),
    );
    check(
        &mut errors,
        "password",
        validators::not_blank(&request.password)
            .or_else(|| validators::min_len(&request.password, MIN_PASSWORD_LEN)),
    );
    check(&mut errors, "firstName", validators::not_blank(&request.first_name));
    check(&mut errors, "lastName", validators::not_blank(&request.last_name));
    finish(errors)
}

fn check(errors: &mut FieldErrors, field: &str, message: Option<String>) {
    if let Some(message) = message {
        errors.insert(field.to_string(), message);
    }
}

fn finish(errors: FieldErrors) -> Result<(), FieldErrors> {
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Single-field checks; each returns the message on failure
pub mod validators {
    pub fn not_blank(value: &str) -> Option<String> {
        value
            .trim()
            .is_empty()
            .then(|| "must not be blank".to_string())
    }

    /// Basic shape check, the service does the authoritative one
    pub fn email(value: &str) -> Option<String> {
        let mut parts = value.split('@');
        let valid = matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty()
        );
        (!valid).then(|| "must be a well-formed email address".to_string())
    }

    pub fn min_len(value: &str, min: usize) -> Option<String> {
        (value.chars().count() < min).then(|| format!("must be at least {min} characters"))
    }
}
