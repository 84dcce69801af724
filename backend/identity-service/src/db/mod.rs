/// Store contracts and their Postgres implementations
pub mod password_resets;
pub mod users;

pub use password_resets::{PgResetTokenStore, ResetTokenStore};
pub use users::{PgUserStore, UserStore};

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::DatabaseSettings;
use crate::error::Result;

/// Open the connection pool backing the Postgres stores.
pub async fn connect(settings: &DatabaseSettings) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.url)
        .await?;

    Ok(pool)
}
