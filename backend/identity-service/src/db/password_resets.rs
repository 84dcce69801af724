/// Password reset token store
///
/// Raw tokens are random alphanumeric strings handed to the user; only a
/// SHA-256 digest is kept at rest. The consuming lookup filters on
/// "unused AND unexpired" in a single query so a token cannot expire between
/// a check and its use.
use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{NewResetToken, PasswordResetToken};

/// Raw token length (before hashing).
const TOKEN_LENGTH: usize = 32;

/// How long spent tokens are kept around before maintenance deletes them.
const PURGE_GRACE_HOURS: i64 = 24;

/// Generate a secure random reset token.
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Hash a token using SHA-256 for storage at rest.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
pub trait ResetTokenStore: Send + Sync {
    async fn create(&self, token: NewResetToken) -> Result<PasswordResetToken>;

    /// Look up a token that is simultaneously unused and unexpired.
    /// One atomic query; never a check-then-act pair.
    async fn find_active(&self, token: &str) -> Result<Option<PasswordResetToken>>;

    async fn mark_used(&self, id: Uuid) -> Result<()>;

    /// Per-user housekeeping on new requests: drop tokens that are already
    /// used or expired. Returns the number removed.
    async fn delete_spent_for_user(&self, user_id: Uuid) -> Result<u64>;

    /// Maintenance sweep across all users.
    async fn purge_expired(&self) -> Result<u64>;
}

/// Postgres-backed reset token store.
#[derive(Clone)]
pub struct PgResetTokenStore {
    pool: PgPool,
}

impl PgResetTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResetTokenStore for PgResetTokenStore {
    async fn create(&self, token: NewResetToken) -> Result<PasswordResetToken> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let token_hash = hash_token(&token.token);

        sqlx::query(
            r#"
            INSERT INTO password_reset_tokens (id, user_id, token_hash, expires_at, used, created_at)
            VALUES ($1, $2, $3, $4, FALSE, $5)
            "#,
        )
        .bind(id)
        .bind(token.user_id)
        .bind(&token_hash)
        .bind(token.expires_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(PasswordResetToken {
            id,
            user_id: token.user_id,
            expires_at: token.expires_at,
            used: false,
            used_at: None,
            created_at: now,
        })
    }

    async fn find_active(&self, token: &str) -> Result<Option<PasswordResetToken>> {
        let record = sqlx::query_as::<_, PasswordResetToken>(
            r#"
            SELECT id, user_id, expires_at, used, used_at, created_at
            FROM password_reset_tokens
            WHERE token_hash = $1 AND used = FALSE AND expires_at > NOW()
            "#,
        )
        .bind(hash_token(token))
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn mark_used(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE password_reset_tokens SET used = TRUE, used_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_spent_for_user(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM password_reset_tokens
            WHERE user_id = $1 AND (used = TRUE OR expires_at <= NOW())
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let threshold = Utc::now() - Duration::hours(PURGE_GRACE_HOURS);

        let result = sqlx::query(
            r#"
            DELETE FROM password_reset_tokens
            WHERE expires_at < $1 OR (used = TRUE AND used_at < $1)
            "#,
        )
        .bind(threshold)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
