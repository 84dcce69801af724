/// Registration / login orchestrator
///
/// Composes the credential store, password hasher, TOTP engine, token
/// service, and reset-token store into the account flows. All business-rule
/// failures surface synchronously as typed errors with stable messages;
/// storage failures propagate without retries.
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use validator::Validate;

use crate::config::{ResetSettings, TotpSettings};
use crate::db::password_resets::{self, ResetTokenStore};
use crate::db::UserStore;
use crate::error::{IdentityError, Result};
use crate::models::{
    NewResetToken, NewUser, OrganizationData, PersonData, ProfileChanges, RegisterRequest, User,
    UserDetails, UserKind, UserProfile,
};
use crate::security::{hash_password, verify_password, TOTPGenerator};
use crate::services::delivery::ResetDelivery;
use crate::services::token::TokenService;
use crate::validators;

/// Successful register/login/verify result: the enriched profile plus a
/// freshly issued bearer token.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub profile: UserProfile,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Returned once at 2FA enablement; the secret and backup codes are not
/// retrievable afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct TwoFactorSetup {
    pub secret: String,
    pub provisioning_uri: String,
    pub qr_svg: String,
    pub backup_codes: Vec<String>,
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    reset_tokens: Arc<dyn ResetTokenStore>,
    delivery: Arc<dyn ResetDelivery>,
    tokens: TokenService,
    reset_ttl: Duration,
    totp_issuer: String,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        reset_tokens: Arc<dyn ResetTokenStore>,
        delivery: Arc<dyn ResetDelivery>,
        tokens: TokenService,
        reset: &ResetSettings,
        totp: &TotpSettings,
    ) -> Self {
        Self {
            users,
            reset_tokens,
            delivery,
            tokens,
            reset_ttl: Duration::hours(reset.token_ttl_hours),
            totp_issuer: totp.issuer.clone(),
        }
    }

    /// Token service used by out-of-scope controllers to establish caller
    /// identity from a bearer header.
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Register a new person or organization account.
    ///
    /// Each precondition fails fast; nothing is written before all checks
    /// pass, and the base + subtype write itself is atomic in the store.
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse> {
        request.validate()?;

        let email = normalize(request.email);
        let contact = normalize(request.contact_number);

        if email.is_none() && contact.is_none() {
            return Err(IdentityError::MissingIdentifier);
        }

        if let Some(email) = &email {
            if !validators::validate_email(email) {
                return Err(IdentityError::Validation("Invalid email format".to_string()));
            }
        }

        if let Some(contact) = &contact {
            if !validators::validate_contact(contact) {
                return Err(IdentityError::Validation(
                    "Invalid contact number format".to_string(),
                ));
            }
        }

        let details = match request.kind {
            UserKind::Person => {
                let occupation =
                    normalize(request.occupation).ok_or(IdentityError::MissingOccupation)?;
                UserDetails::Person(PersonData { occupation })
            }
            UserKind::Organization => {
                let location =
                    normalize(request.location).ok_or(IdentityError::MissingLocation)?;
                UserDetails::Organization(OrganizationData { location })
            }
        };

        if !validators::validate_password(&request.password) {
            return Err(IdentityError::WeakPassword(
                validators::PASSWORD_RULES.to_string(),
            ));
        }

        // Early exit; the store's unique indexes remain the actual guarantee
        // under concurrent registration.
        if let Some(email) = &email {
            if self.users.email_exists(email).await? {
                return Err(IdentityError::UserAlreadyExists);
            }
        }
        if let Some(contact) = &contact {
            if self.users.contact_exists(contact).await? {
                return Err(IdentityError::UserAlreadyExists);
            }
        }

        let password_hash = hash_password(&request.password)?;

        let user = self
            .users
            .create(NewUser {
                first_name: request.first_name,
                last_name: request.last_name,
                email,
                contact_number: contact,
                password_hash,
                details,
            })
            .await?;

        tracing::info!(user_id = %user.id, kind = user.kind().as_str(), "User registered");

        self.respond_with_token(&user)
    }

    /// Log in with an email or contact-number identifier.
    ///
    /// With 2FA enabled the flow stops with [`IdentityError::TwoFactorRequired`];
    /// the caller completes it through [`AuthService::verify_two_factor`].
    pub async fn login(&self, identifier: &str, password: &str) -> Result<AuthResponse> {
        let user = self
            .users
            .find_by_identifier(identifier)
            .await?
            .ok_or(IdentityError::UserNotFound)?;

        if !verify_password(password, &user.password_hash) {
            tracing::warn!(user_id = %user.id, "Login failed: password mismatch");
            return Err(IdentityError::InvalidPassword);
        }

        if user.has_two_fa_enabled() {
            return Err(IdentityError::TwoFactorRequired);
        }

        tracing::info!(user_id = %user.id, "User logged in");

        self.respond_with_token(&user)
    }

    /// Complete a 2FA login with a TOTP code or a backup code.
    /// A backup code is consumed on use and never matches again.
    pub async fn verify_two_factor(&self, identifier: &str, code: &str) -> Result<AuthResponse> {
        let user = self
            .users
            .find_by_identifier(identifier)
            .await?
            .ok_or(IdentityError::UserNotFound)?;

        if !user.two_fa_enabled {
            return Err(IdentityError::TwoFactorNotEnabled);
        }
        let secret = user
            .two_fa_secret
            .as_deref()
            .ok_or(IdentityError::TwoFactorNotEnabled)?;

        if TOTPGenerator::verify_code(secret, code)? {
            tracing::info!(user_id = %user.id, "2FA login verified via TOTP");
        } else if TOTPGenerator::verify_backup_code(user.backup_codes.as_deref(), code) {
            let remaining =
                TOTPGenerator::remove_backup_code(user.backup_codes.as_deref().unwrap_or(&[]), code);
            self.users.replace_backup_codes(user.id, &remaining).await?;
            tracing::info!(
                user_id = %user.id,
                remaining = remaining.len(),
                "2FA login verified via backup code"
            );
        } else {
            tracing::warn!(user_id = %user.id, "2FA verification failed");
            return Err(IdentityError::InvalidTwoFactorCode);
        }

        self.respond_with_token(&user)
    }

    /// Enable 2FA: generates and stores a TOTP secret plus one-time backup
    /// codes, and returns the provisioning payload for the authenticator app.
    pub async fn enable_two_factor(&self, user_id: uuid::Uuid) -> Result<TwoFactorSetup> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(IdentityError::UserNotFound)?;

        let secret = TOTPGenerator::generate_secret();
        let provisioning_uri =
            TOTPGenerator::provisioning_uri(&secret, user.identifier(), &self.totp_issuer);
        let qr_svg = TOTPGenerator::qr_svg(&provisioning_uri)?;
        let backup_codes = TOTPGenerator::generate_backup_codes();

        self.users
            .enable_two_factor(user.id, &secret, &backup_codes)
            .await?;

        tracing::info!(user_id = %user.id, "Two-factor authentication enabled");

        Ok(TwoFactorSetup {
            secret,
            provisioning_uri,
            qr_svg,
            backup_codes,
        })
    }

    /// Disable 2FA, clearing the secret and any remaining backup codes.
    pub async fn disable_two_factor(&self, user_id: uuid::Uuid) -> Result<()> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(IdentityError::UserNotFound)?;

        self.users.disable_two_factor(user.id).await?;

        tracing::info!(user_id = %user.id, "Two-factor authentication disabled");
        Ok(())
    }

    /// Mint a single-use, time-boxed reset token and hand it to the delivery
    /// collaborator. Spent tokens for the user are swept first.
    ///
    /// An unknown identifier fails with [`IdentityError::UserNotFound`],
    /// which discloses account existence to the requester; kept for parity
    /// with the client contract rather than tightened to a uniform reply.
    pub async fn request_password_reset(&self, identifier: &str) -> Result<()> {
        let user = self
            .users
            .find_by_identifier(identifier)
            .await?
            .ok_or(IdentityError::UserNotFound)?;

        let swept = self.reset_tokens.delete_spent_for_user(user.id).await?;
        if swept > 0 {
            tracing::debug!(user_id = %user.id, swept, "Removed spent reset tokens");
        }

        let raw_token = password_resets::generate_token();
        let expires_at = Utc::now() + self.reset_ttl;

        self.reset_tokens
            .create(NewResetToken {
                user_id: user.id,
                token: raw_token.clone(),
                expires_at,
            })
            .await?;

        self.delivery.deliver(&user, &raw_token, expires_at).await?;

        tracing::info!(user_id = %user.id, "Password reset requested");
        Ok(())
    }

    /// Consume a reset token and set the new password.
    pub async fn confirm_password_reset(&self, token: &str, new_password: &str) -> Result<()> {
        if !validators::validate_password(new_password) {
            return Err(IdentityError::WeakPassword(
                validators::PASSWORD_RULES.to_string(),
            ));
        }

        let record = self
            .reset_tokens
            .find_active(token)
            .await?
            .ok_or(IdentityError::InvalidOrExpiredResetToken)?;

        // The active lookup already excludes used tokens; this re-check only
        // guards the invariant with a clearer diagnostic.
        if record.used {
            return Err(IdentityError::ResetTokenAlreadyUsed);
        }

        let password_hash = hash_password(new_password)?;
        self.users
            .update_password(record.user_id, &password_hash)
            .await?;
        self.reset_tokens.mark_used(record.id).await?;

        tracing::info!(user_id = %record.user_id, "Password reset completed");
        Ok(())
    }

    /// Enriched profile for the authenticated caller.
    pub async fn current_user(&self, identifier: &str) -> Result<UserProfile> {
        let user = self
            .users
            .find_by_identifier(identifier)
            .await?
            .ok_or(IdentityError::UserNotFound)?;

        Ok(UserProfile::from(&user))
    }

    /// Apply profile changes, re-enforcing identifier presence, identifier
    /// uniqueness, and subtype-field consistency.
    pub async fn update_profile(
        &self,
        user_id: uuid::Uuid,
        changes: ProfileChanges,
    ) -> Result<UserProfile> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(IdentityError::UserNotFound)?;

        if let Some(email) = &changes.email {
            if !validators::validate_email(email) {
                return Err(IdentityError::Validation("Invalid email format".to_string()));
            }
            if Some(email) != user.email.as_ref() && self.users.email_exists(email).await? {
                return Err(IdentityError::UserAlreadyExists);
            }
        }

        if let Some(contact) = &changes.contact_number {
            if !validators::validate_contact(contact) {
                return Err(IdentityError::Validation(
                    "Invalid contact number format".to_string(),
                ));
            }
            if Some(contact) != user.contact_number.as_ref()
                && self.users.contact_exists(contact).await?
            {
                return Err(IdentityError::UserAlreadyExists);
            }
        }

        // Identifiers cannot be cleared through this path; the merged state
        // must still carry at least one.
        let next_email = changes.email.as_ref().or(user.email.as_ref());
        let next_contact = changes.contact_number.as_ref().or(user.contact_number.as_ref());
        if next_email.is_none() && next_contact.is_none() {
            return Err(IdentityError::MissingIdentifier);
        }

        match user.kind() {
            UserKind::Person => {
                if changes.location.is_some() {
                    return Err(IdentityError::Validation(
                        "Location applies only to organization accounts".to_string(),
                    ));
                }
                if matches!(&changes.occupation, Some(o) if o.trim().is_empty()) {
                    return Err(IdentityError::MissingOccupation);
                }
            }
            UserKind::Organization => {
                if changes.occupation.is_some() {
                    return Err(IdentityError::Validation(
                        "Occupation applies only to person accounts".to_string(),
                    ));
                }
                if matches!(&changes.location, Some(l) if l.trim().is_empty()) {
                    return Err(IdentityError::MissingLocation);
                }
            }
        }

        let updated = self.users.update_profile(user.id, changes).await?;

        tracing::info!(user_id = %updated.id, "Profile updated");
        Ok(UserProfile::from(&updated))
    }

    /// Change password with the current one as proof of possession.
    pub async fn change_password(
        &self,
        user_id: uuid::Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(IdentityError::UserNotFound)?;

        if !verify_password(current_password, &user.password_hash) {
            return Err(IdentityError::InvalidPassword);
        }

        if !validators::validate_password(new_password) {
            return Err(IdentityError::WeakPassword(
                validators::PASSWORD_RULES.to_string(),
            ));
        }

        let password_hash = hash_password(new_password)?;
        self.users.update_password(user.id, &password_hash).await?;

        tracing::info!(user_id = %user.id, "Password changed");
        Ok(())
    }

    fn respond_with_token(&self, user: &User) -> Result<AuthResponse> {
        let issued = self.tokens.issue(user)?;
        Ok(AuthResponse {
            profile: UserProfile::from(user),
            token: issued.token,
            expires_at: issued.expires_at,
        })
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
