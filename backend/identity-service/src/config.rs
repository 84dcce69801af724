//! Configuration for the identity core
//!
//! Loaded from environment variables, with a `.env` fallback for local
//! development. Token key material is injected into
//! [`TokenService`](crate::services::TokenService) at construction; nothing
//! here lives in a process global.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::str::FromStr;

/// Default bearer-token lifetime: 24 hours.
const DEFAULT_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;

/// Default password-reset token window: 24 hours.
const DEFAULT_RESET_TTL_HOURS: i64 = 24;

const DEFAULT_TOTP_ISSUER: &str = "Reverb";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub reset: ResetSettings,
    pub totp: TotpSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// HS256 signing secret.
    pub secret: String,
    /// Token lifetime in seconds.
    pub ttl_seconds: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetSettings {
    /// Password-reset token lifetime in hours.
    pub token_ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TotpSettings {
    /// Issuer shown in authenticator apps and embedded in provisioning URIs.
    pub issuer: String,
}

impl Settings {
    /// Load settings from environment variables (with `.env` fallback in
    /// development builds).
    pub fn from_env() -> Result<Self> {
        if cfg!(debug_assertions) {
            dotenvy::dotenv().ok();
        }

        Ok(Settings {
            database: DatabaseSettings {
                url: env::var("DATABASE_URL").context("DATABASE_URL is required")?,
                max_connections: parse_env_or("DATABASE_MAX_CONNECTIONS", 5)?,
            },
            jwt: JwtSettings {
                secret: env::var("JWT_SECRET").context("JWT_SECRET is required")?,
                ttl_seconds: parse_env_or("JWT_TTL_SECONDS", DEFAULT_TOKEN_TTL_SECONDS)?,
            },
            reset: ResetSettings {
                token_ttl_hours: parse_env_or("PASSWORD_RESET_TTL_HOURS", DEFAULT_RESET_TTL_HOURS)?,
            },
            totp: TotpSettings {
                issuer: env::var("TOTP_ISSUER").unwrap_or_else(|_| DEFAULT_TOTP_ISSUER.to_string()),
            },
        })
    }
}

fn parse_env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw.parse().with_context(|| format!("{key} is not valid")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_or_uses_default_when_unset() {
        let value: i64 = parse_env_or("IDENTITY_SERVICE_TEST_UNSET_VAR", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_default_ttls() {
        assert_eq!(DEFAULT_TOKEN_TTL_SECONDS, 86_400);
        assert_eq!(DEFAULT_RESET_TTL_HOURS, 24);
    }
}
