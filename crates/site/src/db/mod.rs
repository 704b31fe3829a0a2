//! `PostgreSQL` connection for persistent browser sessions.
//!
//! The site keeps no tables of its own. Profiles live in the document store;
//! the database only backs `tower-sessions` when `SITE_DATABASE_URL` is set.
//!
//! # Migrations
//!
//! The session table is created by the CLI:
//! ```bash
//! cargo run -p a2a-labs-cli -- migrate sessions
//! ```

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
