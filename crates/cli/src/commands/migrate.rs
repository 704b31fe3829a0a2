//! Session store migrations.
//!
//! # Usage
//!
//! ```bash
//! a2a-labs-cli migrate sessions
//! ```
//!
//! # Environment Variables
//!
//! - `SITE_DATABASE_URL` - `PostgreSQL` connection string for the session store
//!
//! The site never migrates on startup; run this once per database before
//! pointing the site at it.

use secrecy::SecretString;
use tower_sessions_sqlx_store::PostgresStore;

/// Errors from migration commands.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Create the `tower_sessions` schema and session table.
///
/// # Errors
///
/// Returns `MigrationError` if the URL is missing, the database is
/// unreachable or the DDL fails.
pub async fn sessions() -> Result<(), MigrationError> {
    let _ = dotenvy::dotenv();

    let database_url = std::env::var("SITE_DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| MigrationError::MissingEnvVar("SITE_DATABASE_URL"))?;

    tracing::info!("Connecting to session database...");
    let pool = a2a_labs_site::db::create_pool(&database_url).await?;

    tracing::info!("Creating session table...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Session store migration complete!");
    Ok(())
}
