#![allow(dead_code)]

//! In-memory store implementations and fixtures for orchestrator tests.
//! No database or network required.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use identity_service::config::{JwtSettings, ResetSettings, TotpSettings};
use identity_service::db::{ResetTokenStore, UserStore};
use identity_service::error::{IdentityError, Result};
use identity_service::models::{
    NewResetToken, NewUser, PasswordResetToken, ProfileChanges, RegisterRequest, User, UserKind,
};
use identity_service::services::{AuthService, ResetDelivery, TokenService};

pub const TEST_PASSWORD: &str = "Secret123";
pub const TEST_JWT_SECRET: &str = "integration-test-signing-secret";

/// Credential store over a HashMap, enforcing the same uniqueness rules as
/// the Postgres unique indexes.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn get(&self, id: Uuid) -> Option<User> {
        self.users.lock().unwrap().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.users.lock().unwrap().len()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, new_user: NewUser) -> Result<User> {
        let mut users = self.users.lock().unwrap();

        // Unique-index backstop, independent of the orchestrator pre-checks
        for existing in users.values() {
            if new_user.email.is_some() && existing.email == new_user.email {
                return Err(IdentityError::UserAlreadyExists);
            }
            if new_user.contact_number.is_some()
                && existing.contact_number == new_user.contact_number
            {
                return Err(IdentityError::UserAlreadyExists);
            }
        }

        let user = User {
            id: Uuid::new_v4(),
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: new_user.email,
            contact_number: new_user.contact_number,
            password_hash: new_user.password_hash,
            logo_url: None,
            domain: None,
            description: None,
            certified: false,
            two_fa_enabled: false,
            two_fa_secret: None,
            backup_codes: None,
            details: new_user.details,
            created_at: Utc::now(),
        };

        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| {
                u.email.as_deref() == Some(identifier)
                    || u.contact_number.as_deref() == Some(identifier)
            })
            .cloned())
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .any(|u| u.email.as_deref() == Some(email)))
    }

    async fn contact_exists(&self, contact: &str) -> Result<bool> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .any(|u| u.contact_number.as_deref() == Some(contact)))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<()> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&id).ok_or(IdentityError::UserNotFound)?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> Result<User> {
        let mut users = self.users.lock().unwrap();

        if let Some(email) = &changes.email {
            if users
                .values()
                .any(|u| u.id != id && u.email.as_deref() == Some(email))
            {
                return Err(IdentityError::UserAlreadyExists);
            }
        }
        if let Some(contact) = &changes.contact_number {
            if users
                .values()
                .any(|u| u.id != id && u.contact_number.as_deref() == Some(contact))
            {
                return Err(IdentityError::UserAlreadyExists);
            }
        }

        let user = users.get_mut(&id).ok_or(IdentityError::UserNotFound)?;

        if let Some(first_name) = changes.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            user.last_name = last_name;
        }
        if let Some(email) = changes.email {
            user.email = Some(email);
        }
        if let Some(contact) = changes.contact_number {
            user.contact_number = Some(contact);
        }
        if let Some(logo_url) = changes.logo_url {
            user.logo_url = Some(logo_url);
        }
        if let Some(domain) = changes.domain {
            user.domain = Some(domain);
        }
        if let Some(description) = changes.description {
            user.description = Some(description);
        }
        if let Some(occupation) = changes.occupation {
            if let identity_service::models::UserDetails::Person(data) = &mut user.details {
                data.occupation = occupation;
            }
        }
        if let Some(location) = changes.location {
            if let identity_service::models::UserDetails::Organization(data) = &mut user.details {
                data.location = location;
            }
        }

        Ok(user.clone())
    }

    async fn enable_two_factor(
        &self,
        id: Uuid,
        secret: &str,
        backup_codes: &[String],
    ) -> Result<()> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&id).ok_or(IdentityError::UserNotFound)?;
        user.two_fa_enabled = true;
        user.two_fa_secret = Some(secret.to_string());
        user.backup_codes = Some(backup_codes.to_vec());
        Ok(())
    }

    async fn disable_two_factor(&self, id: Uuid) -> Result<()> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&id).ok_or(IdentityError::UserNotFound)?;
        user.two_fa_enabled = false;
        user.two_fa_secret = None;
        user.backup_codes = None;
        Ok(())
    }

    async fn replace_backup_codes(&self, id: Uuid, codes: &[String]) -> Result<()> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&id).ok_or(IdentityError::UserNotFound)?;
        user.backup_codes = Some(codes.to_vec());
        Ok(())
    }
}

struct StoredToken {
    record: PasswordResetToken,
    raw: String,
}

/// Reset-token store over a Vec; raw tokens are kept as-is (digest-at-rest
/// is a property of the Postgres implementation, not the contract).
#[derive(Default)]
pub struct InMemoryResetTokenStore {
    tokens: Mutex<Vec<StoredToken>>,
}

impl InMemoryResetTokenStore {
    pub fn count_for(&self, user_id: Uuid) -> usize {
        self.tokens
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.record.user_id == user_id)
            .count()
    }
}

#[async_trait]
impl ResetTokenStore for InMemoryResetTokenStore {
    async fn create(&self, token: NewResetToken) -> Result<PasswordResetToken> {
        let record = PasswordResetToken {
            id: Uuid::new_v4(),
            user_id: token.user_id,
            expires_at: token.expires_at,
            used: false,
            used_at: None,
            created_at: Utc::now(),
        };

        self.tokens.lock().unwrap().push(StoredToken {
            record: record.clone(),
            raw: token.token,
        });

        Ok(record)
    }

    async fn find_active(&self, token: &str) -> Result<Option<PasswordResetToken>> {
        let now = Utc::now();
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.raw == token && !t.record.used && t.record.expires_at > now)
            .map(|t| t.record.clone()))
    }

    async fn mark_used(&self, id: Uuid) -> Result<()> {
        let mut tokens = self.tokens.lock().unwrap();
        if let Some(stored) = tokens.iter_mut().find(|t| t.record.id == id) {
            stored.record.used = true;
            stored.record.used_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn delete_spent_for_user(&self, user_id: Uuid) -> Result<u64> {
        let now = Utc::now();
        let mut tokens = self.tokens.lock().unwrap();
        let before = tokens.len();
        tokens.retain(|t| {
            t.record.user_id != user_id || (!t.record.used && t.record.expires_at > now)
        });
        Ok((before - tokens.len()) as u64)
    }

    async fn purge_expired(&self) -> Result<u64> {
        let now = Utc::now();
        let mut tokens = self.tokens.lock().unwrap();
        let before = tokens.len();
        tokens.retain(|t| !t.record.used && t.record.expires_at > now);
        Ok((before - tokens.len()) as u64)
    }
}

/// Delivery stub that captures minted tokens for assertions.
#[derive(Default)]
pub struct CapturingDelivery {
    tokens: Mutex<Vec<String>>,
}

impl CapturingDelivery {
    pub fn last_token(&self) -> Option<String> {
        self.tokens.lock().unwrap().last().cloned()
    }

    pub fn delivered_count(&self) -> usize {
        self.tokens.lock().unwrap().len()
    }
}

#[async_trait]
impl ResetDelivery for CapturingDelivery {
    async fn deliver(&self, _user: &User, token: &str, _expires_at: DateTime<Utc>) -> Result<()> {
        self.tokens.lock().unwrap().push(token.to_string());
        Ok(())
    }
}

pub struct TestHarness {
    pub service: AuthService,
    pub users: Arc<InMemoryUserStore>,
    pub resets: Arc<InMemoryResetTokenStore>,
    pub delivery: Arc<CapturingDelivery>,
    pub tokens: TokenService,
}

pub fn harness() -> TestHarness {
    harness_with_reset_ttl(24)
}

pub fn harness_with_reset_ttl(token_ttl_hours: i64) -> TestHarness {
    let users = Arc::new(InMemoryUserStore::default());
    let resets = Arc::new(InMemoryResetTokenStore::default());
    let delivery = Arc::new(CapturingDelivery::default());

    let jwt = JwtSettings {
        secret: TEST_JWT_SECRET.to_string(),
        ttl_seconds: 3600,
    };
    let tokens = TokenService::new(&jwt);

    let service = AuthService::new(
        users.clone(),
        resets.clone(),
        delivery.clone(),
        TokenService::new(&jwt),
        &ResetSettings { token_ttl_hours },
        &TotpSettings {
            issuer: "Reverb".to_string(),
        },
    );

    TestHarness {
        service,
        users,
        resets,
        delivery,
        tokens,
    }
}

pub fn person_request(email: &str) -> RegisterRequest {
    RegisterRequest {
        kind: UserKind::Person,
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        email: Some(email.to_string()),
        contact_number: None,
        password: TEST_PASSWORD.to_string(),
        occupation: Some("Engineer".to_string()),
        location: None,
    }
}

pub fn org_request(contact: &str) -> RegisterRequest {
    RegisterRequest {
        kind: UserKind::Organization,
        first_name: "Acme".to_string(),
        last_name: "Labs".to_string(),
        email: None,
        contact_number: Some(contact.to_string()),
        password: TEST_PASSWORD.to_string(),
        occupation: None,
        location: Some("Berlin".to_string()),
    }
}

/// Compute the TOTP code an authenticator app would show right now for a
/// base32-encoded secret.
pub fn current_totp_code(secret: &str) -> String {
    let bytes = decode_totp_secret(secret);
    let now = unix_now();
    totp_lite::totp_custom::<totp_lite::Sha1>(30, 6, &bytes, now)
}

/// A six-digit code guaranteed to fall outside the accepted skew window.
pub fn wrong_totp_code(secret: &str) -> String {
    let bytes = decode_totp_secret(secret);
    let now = unix_now();
    let accepted: Vec<String> = [now - 30, now, now + 30]
        .iter()
        .map(|t| totp_lite::totp_custom::<totp_lite::Sha1>(30, 6, &bytes, *t))
        .collect();

    (0..1_000_000)
        .map(|n| format!("{n:06}"))
        .find(|c| !accepted.contains(c))
        .unwrap()
}

fn decode_totp_secret(secret: &str) -> Vec<u8> {
    base32::decode(base32::Alphabet::Rfc4648 { padding: false }, secret)
        .expect("secret should be valid base32")
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}
