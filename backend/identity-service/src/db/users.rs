/// Credential store: user records with their subtype payloads
///
/// The base identity lives in `users`; the subtype field lives in `persons`
/// or `organizations`, keyed by the same id. Uniqueness of email and contact
/// number is enforced by unique indexes in the store itself - the
/// orchestrator's existence pre-checks are an early exit, not the guarantee.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{IdentityError, Result};
use crate::models::{NewUser, OrganizationData, PersonData, ProfileChanges, User, UserDetails, UserKind};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist the base record and the subtype record atomically; a failure
    /// on the subtype write must not leave an orphaned base record.
    async fn create(&self, new_user: NewUser) -> Result<User>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Look up a user by login identifier, matching either the email or the
    /// contact-number column.
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>>;

    async fn email_exists(&self, email: &str) -> Result<bool>;

    async fn contact_exists(&self, contact: &str) -> Result<bool>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<()>;

    /// Apply profile changes and return the updated record. Identifier
    /// invariants are the orchestrator's responsibility; uniqueness is
    /// still backed by the store's constraints.
    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> Result<User>;

    async fn enable_two_factor(
        &self,
        id: Uuid,
        secret: &str,
        backup_codes: &[String],
    ) -> Result<()>;

    async fn disable_two_factor(&self, id: Uuid) -> Result<()>;

    /// Overwrite the remaining backup codes after one has been consumed.
    async fn replace_backup_codes(&self, id: Uuid, codes: &[String]) -> Result<()>;
}

/// Postgres-backed credential store.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_SELECT: &str = r#"
SELECT u.id, u.kind, u.first_name, u.last_name, u.email, u.contact_number,
       u.password_hash, u.logo_url, u.domain, u.description, u.certified,
       u.two_fa_enabled, u.two_fa_secret, u.backup_codes, u.created_at,
       p.occupation, o.location
FROM users u
LEFT JOIN persons p ON p.user_id = u.id
LEFT JOIN organizations o ON o.user_id = u.id
"#;

/// Flat row shape of the three-table join; converted into the tagged model.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    kind: String,
    first_name: String,
    last_name: String,
    email: Option<String>,
    contact_number: Option<String>,
    password_hash: String,
    logo_url: Option<String>,
    domain: Option<String>,
    description: Option<String>,
    certified: bool,
    two_fa_enabled: bool,
    two_fa_secret: Option<String>,
    backup_codes: Option<Vec<String>>,
    created_at: DateTime<Utc>,
    occupation: Option<String>,
    location: Option<String>,
}

impl UserRow {
    fn into_user(self) -> Result<User> {
        let kind: UserKind = self.kind.parse().map_err(IdentityError::Database)?;

        // A missing subtype row here is a broken programming invariant, not
        // a user-facing condition.
        let details = match kind {
            UserKind::Person => UserDetails::Person(PersonData {
                occupation: self.occupation.ok_or_else(|| {
                    IdentityError::Database(format!("user {} is missing its person record", self.id))
                })?,
            }),
            UserKind::Organization => UserDetails::Organization(OrganizationData {
                location: self.location.ok_or_else(|| {
                    IdentityError::Database(format!(
                        "user {} is missing its organization record",
                        self.id
                    ))
                })?,
            }),
        };

        Ok(User {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            contact_number: self.contact_number,
            password_hash: self.password_hash,
            logo_url: self.logo_url,
            domain: self.domain,
            description: self.description,
            certified: self.certified,
            two_fa_enabled: self.two_fa_enabled,
            two_fa_secret: self.two_fa_secret,
            backup_codes: self.backup_codes,
            details,
            created_at: self.created_at,
        })
    }
}

fn map_unique_violation(err: sqlx::Error) -> IdentityError {
    if let sqlx::Error::Database(db_err) = &err {
        // 23505: unique_violation
        if db_err.code().as_deref() == Some("23505") {
            return IdentityError::UserAlreadyExists;
        }
    }
    err.into()
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, new_user: NewUser) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        let id = Uuid::new_v4();
        let kind = new_user.details.kind();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users (id, kind, first_name, last_name, email, contact_number,
                               password_hash, certified, two_fa_enabled, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, FALSE, $8)
            "#,
        )
        .bind(id)
        .bind(kind.as_str())
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(new_user.email.as_deref())
        .bind(new_user.contact_number.as_deref())
        .bind(&new_user.password_hash)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        match &new_user.details {
            UserDetails::Person(data) => {
                sqlx::query("INSERT INTO persons (user_id, occupation) VALUES ($1, $2)")
                    .bind(id)
                    .bind(&data.occupation)
                    .execute(&mut *tx)
                    .await?;
            }
            UserDetails::Organization(data) => {
                sqlx::query("INSERT INTO organizations (user_id, location) VALUES ($1, $2)")
                    .bind(id)
                    .bind(&data.location)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;

        Ok(User {
            id,
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
            created_at: now,
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{USER_SELECT} WHERE u.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "{USER_SELECT} WHERE u.email = $1 OR u.contact_number = $1"
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn contact_exists(&self, contact: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE contact_number = $1)",
        )
        .bind(contact)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(IdentityError::UserNotFound);
        }

        Ok(())
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                contact_number = COALESCE($5, contact_number),
                logo_url = COALESCE($6, logo_url),
                domain = COALESCE($7, domain),
                description = COALESCE($8, description)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(changes.first_name.as_deref())
        .bind(changes.last_name.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.contact_number.as_deref())
        .bind(changes.logo_url.as_deref())
        .bind(changes.domain.as_deref())
        .bind(changes.description.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        if let Some(occupation) = &changes.occupation {
            sqlx::query("UPDATE persons SET occupation = $2 WHERE user_id = $1")
                .bind(id)
                .bind(occupation)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(location) = &changes.location {
            sqlx::query("UPDATE organizations SET location = $2 WHERE user_id = $1")
                .bind(id)
                .bind(location)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        self.find_by_id(id).await?.ok_or(IdentityError::UserNotFound)
    }

    async fn enable_two_factor(
        &self,
        id: Uuid,
        secret: &str,
        backup_codes: &[String],
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET two_fa_enabled = TRUE, two_fa_secret = $2, backup_codes = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(secret)
        .bind(backup_codes)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(IdentityError::UserNotFound);
        }

        Ok(())
    }

    async fn disable_two_factor(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET two_fa_enabled = FALSE, two_fa_secret = NULL, backup_codes = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(IdentityError::UserNotFound);
        }

        Ok(())
    }

    async fn replace_backup_codes(&self, id: Uuid, codes: &[String]) -> Result<()> {
        let result = sqlx::query("UPDATE users SET backup_codes = $2 WHERE id = $1")
            .bind(id)
            .bind(codes)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(IdentityError::UserNotFound);
        }

        Ok(())
    }
}
