/// Identity Service Library
///
/// Authentication and credential-lifecycle core for the Reverb backend:
/// registration across the person/organization hierarchy, password login,
/// bearer-token issuance and verification, TOTP two-factor authentication
/// with backup codes, and the password-reset token lifecycle.
///
/// ## Modules
///
/// - `config`: Service configuration
/// - `db`: Store contracts and Postgres repositories
/// - `error`: Error types
/// - `models`: Data models
/// - `security`: Password hashing and TOTP
/// - `services`: Orchestrator, token service, reset-token delivery
/// - `validators`: Input validation
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod security;
pub mod services;
pub mod validators;

// Re-export commonly used types
pub use error::{ErrorCategory, IdentityError, Result};
pub use models::{RegisterRequest, User, UserKind, UserProfile};
pub use services::{AuthResponse, AuthService, TokenService, TwoFactorSetup};
