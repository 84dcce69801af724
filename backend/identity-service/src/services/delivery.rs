/// Reset-token delivery collaborator
///
/// Actual transport (email/SMS) is owned by an external service; the core
/// only hands the minted token over this seam.
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::User;

#[async_trait]
pub trait ResetDelivery: Send + Sync {
    async fn deliver(&self, user: &User, token: &str, expires_at: DateTime<Utc>) -> Result<()>;
}

/// Placeholder used until a transport is wired in. Logs that a token was
/// issued without ever logging the token itself.
pub struct LogOnlyDelivery;

#[async_trait]
impl ResetDelivery for LogOnlyDelivery {
    async fn deliver(&self, user: &User, _token: &str, expires_at: DateTime<Utc>) -> Result<()> {
        tracing::info!(
            user_id = %user.id,
            %expires_at,
            "Password reset token issued; no delivery transport configured"
        );
        Ok(())
    }
}
