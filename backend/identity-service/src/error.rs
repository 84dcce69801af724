use thiserror::Error;

pub type Result<T> = std::result::Result<T, IdentityError>;

/// Transport-neutral classification of an error, used by the (out-of-scope)
/// controllers to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed or incomplete input (400).
    Validation,
    /// A uniqueness rule would be violated (409).
    Conflict,
    /// The referenced user or token does not exist (404).
    NotFound,
    /// Credentials, codes, or bearer tokens failed verification (401).
    Authentication,
    /// Storage or programming-invariant failure (500).
    Internal,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Either email or contact number must be provided")]
    MissingIdentifier,

    #[error("Occupation is required for person accounts")]
    MissingOccupation,

    #[error("Location is required for organization accounts")]
    MissingLocation,

    #[error("Password too weak: {0}")]
    WeakPassword(String),

    #[error("User already exists")]
    UserAlreadyExists,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Two-factor code required")]
    TwoFactorRequired,

    #[error("Two-factor authentication is not enabled")]
    TwoFactorNotEnabled,

    #[error("Invalid two-factor code")]
    InvalidTwoFactorCode,

    #[error("Invalid or expired password reset token")]
    InvalidOrExpiredResetToken,

    #[error("Password reset token already used")]
    ResetTokenAlreadyUsed,

    #[error("Malformed token")]
    TokenMalformed,

    #[error("Invalid token signature")]
    TokenInvalidSignature,

    #[error("Token expired")]
    TokenExpired,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IdentityError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            IdentityError::MissingIdentifier
            | IdentityError::MissingOccupation
            | IdentityError::MissingLocation
            | IdentityError::WeakPassword(_)
            | IdentityError::Validation(_) => ErrorCategory::Validation,

            IdentityError::UserAlreadyExists => ErrorCategory::Conflict,

            IdentityError::UserNotFound => ErrorCategory::NotFound,

            IdentityError::InvalidPassword
            | IdentityError::TwoFactorRequired
            | IdentityError::TwoFactorNotEnabled
            | IdentityError::InvalidTwoFactorCode
            | IdentityError::InvalidOrExpiredResetToken
            | IdentityError::ResetTokenAlreadyUsed
            | IdentityError::TokenMalformed
            | IdentityError::TokenInvalidSignature
            | IdentityError::TokenExpired => ErrorCategory::Authentication,

            IdentityError::Database(_) | IdentityError::Internal(_) => ErrorCategory::Internal,
        }
    }
}

// Conversions from external error types
impl From<sqlx::Error> for IdentityError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {}", err);
        IdentityError::Database(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for IdentityError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => IdentityError::TokenExpired,
            ErrorKind::InvalidSignature => IdentityError::TokenInvalidSignature,
            _ => IdentityError::TokenMalformed,
        }
    }
}

impl From<validator::ValidationErrors> for IdentityError {
    fn from(err: validator::ValidationErrors) -> Self {
        IdentityError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_messages() {
        assert_eq!(
            IdentityError::UserAlreadyExists.to_string(),
            "User already exists"
        );
        assert_eq!(
            IdentityError::InvalidPassword.to_string(),
            "Invalid password"
        );
        assert_eq!(
            IdentityError::MissingIdentifier.to_string(),
            "Either email or contact number must be provided"
        );
    }

    #[test]
    fn categories_map_to_status_families() {
        assert_eq!(
            IdentityError::MissingIdentifier.category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            IdentityError::UserAlreadyExists.category(),
            ErrorCategory::Conflict
        );
        assert_eq!(
            IdentityError::UserNotFound.category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            IdentityError::TokenExpired.category(),
            ErrorCategory::Authentication
        );
        assert_eq!(
            IdentityError::Database("boom".into()).category(),
            ErrorCategory::Internal
        );
    }
}
