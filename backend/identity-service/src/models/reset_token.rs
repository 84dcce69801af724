/// Password reset token lifecycle: `Created` -> `Used` (terminal), or
/// `Created` -> expired (terminal, never used). Expired and used tokens are
/// inert; they are swept per-user on new requests.
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PasswordResetToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PasswordResetToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Payload for minting a token. `token` is the raw secret handed to the user;
/// stores keep only a digest of it at rest.
#[derive(Debug, Clone)]
pub struct NewResetToken {
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
