use once_cell::sync::Lazy;
use regex::Regex;

/// Input validation utilities for the identity core

// Compile regex patterns once at startup; both are hardcoded constants.
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("hardcoded email regex is invalid - fix source code")
});

static CONTACT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+?[0-9]{7,15}$").expect("hardcoded contact regex is invalid - fix source code")
});

/// Stable description of the password rules, used in `WeakPassword` errors.
pub const PASSWORD_RULES: &str =
    "must be at least 8 characters with an uppercase letter, a lowercase letter, and a digit";

/// Validate email format (RFC 5322 simplified)
pub fn validate_email(email: &str) -> bool {
    !email.is_empty() && email.len() <= 254 && EMAIL_REGEX.is_match(email)
}

/// Validate contact number format (E.164-ish: optional `+`, 7-15 digits)
pub fn validate_contact(contact: &str) -> bool {
    CONTACT_REGEX.is_match(contact)
}

/// Validate password strength requirements
/// - Minimum 8 characters
/// - At least one uppercase letter
/// - At least one lowercase letter
/// - At least one digit
pub fn validate_password(password: &str) -> bool {
    if password.len() < 8 {
        return false;
    }

    let has_uppercase = password.chars().any(|c| c.is_uppercase());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    has_uppercase && has_lowercase && has_digit
}
