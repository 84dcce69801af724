/// Bearer token issuance and verification
///
/// Tokens are stateless: there is no revocation list, and logout is purely a
/// client-side discard. A compromised token therefore stays valid until its
/// natural expiry; key material and TTL come from the injected
/// [`JwtSettings`](crate::config::JwtSettings) rather than process globals.
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtSettings;
use crate::error::{IdentityError, Result};
use crate::models::User;

/// Claim set carried by every bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Login identifier: email when present, contact number otherwise.
    pub sub: String,
    /// Owning user id.
    pub uid: Uuid,
    /// Account discriminator (`PERSON` / `ORGANIZATION`).
    pub role: String,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(settings: &JwtSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // No leeway: a token past its exp is expired, full stop.
        validation.leeway = 0;

        TokenService {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation,
            ttl: Duration::seconds(settings.ttl_seconds),
        }
    }

    /// Sign a bearer token for `user` carrying identity and role claims.
    pub fn issue(&self, user: &User) -> Result<IssuedToken> {
        let now = Utc::now();
        let expires_at = now + self.ttl;

        let claims = Claims {
            sub: user.identifier().to_string(),
            uid: user.id,
            role: user.kind().as_str().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| IdentityError::Internal("Failed to sign token".to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify signature and expiry, returning the embedded claims.
    ///
    /// Failures are distinguishable: [`IdentityError::TokenMalformed`] for
    /// input that is not a well-formed JWT, [`IdentityError::TokenInvalidSignature`]
    /// for a signature mismatch, and [`IdentityError::TokenExpired`] for a
    /// validly-signed token past its expiry.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    /// Middleware contract: establish the caller's user id from an
    /// `Authorization: Bearer <token>` header value.
    pub fn bearer_user_id(&self, header_value: &str) -> Result<Uuid> {
        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or(IdentityError::TokenMalformed)?;

        Ok(self.verify(token)?.uid)
    }
}
