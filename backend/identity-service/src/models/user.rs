/// User model for the identity core
///
/// Accounts are polymorphic: every user is either a person or an
/// organization. The base identity lives in one record; the subtype payload
/// (`occupation` or `location`) is embedded as a tagged union so the pair can
/// never disagree.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Discriminator distinguishing the two account subtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserKind {
    Person,
    Organization,
}

impl UserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserKind::Person => "PERSON",
            UserKind::Organization => "ORGANIZATION",
        }
    }
}

impl std::str::FromStr for UserKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PERSON" => Ok(UserKind::Person),
            "ORGANIZATION" => Ok(UserKind::Organization),
            other => Err(format!("unknown user kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonData {
    pub occupation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationData {
    pub location: String,
}

/// Subtype payload. Carrying the data inside the tag makes an orphaned or
/// mismatched subtype record unrepresentable in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UserDetails {
    Person(PersonData),
    Organization(OrganizationData),
}

impl UserDetails {
    pub fn kind(&self) -> UserKind {
        match self {
            UserDetails::Person(_) => UserKind::Person,
            UserDetails::Organization(_) => UserKind::Organization,
        }
    }

    pub fn occupation(&self) -> Option<&str> {
        match self {
            UserDetails::Person(data) => Some(&data.occupation),
            UserDetails::Organization(_) => None,
        }
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            UserDetails::Person(_) => None,
            UserDetails::Organization(data) => Some(&data.location),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// At least one of `email` / `contact_number` is always present.
    pub email: Option<String>,
    pub contact_number: Option<String>,
    pub password_hash: String,
    pub logo_url: Option<String>,
    pub domain: Option<String>,
    pub description: Option<String>,
    pub certified: bool,
    pub two_fa_enabled: bool,
    pub two_fa_secret: Option<String>,
    /// Remaining one-time backup codes; consumed codes are removed.
    pub backup_codes: Option<Vec<String>>,
    pub details: UserDetails,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn kind(&self) -> UserKind {
        self.details.kind()
    }

    /// Preferred login identifier: email when present, contact otherwise.
    pub fn identifier(&self) -> &str {
        self.email
            .as_deref()
            .or(self.contact_number.as_deref())
            .unwrap_or_default()
    }

    pub fn has_two_fa_enabled(&self) -> bool {
        self.two_fa_enabled && self.two_fa_secret.is_some()
    }
}

/// Payload for creating a user; the store persists the base record and the
/// subtype record atomically.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub contact_number: Option<String>,
    pub password_hash: String,
    pub details: UserDetails,
}

/// Optional fields for profile updates; `None` leaves a field unchanged.
/// Identifiers cannot be cleared through this path, so the
/// at-least-one-identifier invariant is re-checked against the merged state.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub contact_number: Option<String>,
    pub logo_url: Option<String>,
    pub domain: Option<String>,
    pub description: Option<String>,
    pub occupation: Option<String>,
    pub location: Option<String>,
}

/// Registration input
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    pub kind: UserKind,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    /// Format-checked by the orchestrator after normalization, so a blank
    /// value counts as absent rather than malformed.
    pub email: Option<String>,
    pub contact_number: Option<String>,
    pub password: String,
    /// Required when `kind` is `Person`.
    pub occupation: Option<String>,
    /// Required when `kind` is `Organization`.
    pub location: Option<String>,
}

/// Enriched profile returned by register/login/current-user: base fields plus
/// the subtype field matching the discriminator.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub kind: UserKind,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub contact_number: Option<String>,
    pub logo_url: Option<String>,
    pub domain: Option<String>,
    pub description: Option<String>,
    pub certified: bool,
    pub two_fa_enabled: bool,
    pub occupation: Option<String>,
    pub location: Option<String>,
    pub registered_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        UserProfile {
            id: user.id,
            kind: user.kind(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            contact_number: user.contact_number.clone(),
            logo_url: user.logo_url.clone(),
            domain: user.domain.clone(),
            description: user.description.clone(),
            certified: user.certified,
            two_fa_enabled: user.two_fa_enabled,
            occupation: user.details.occupation().map(str::to_owned),
            location: user.details.location().map(str::to_owned),
            registered_at: user.created_at,
        }
    }
}
