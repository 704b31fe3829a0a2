//! Session middleware configuration.
//!
//! Sessions live in `PostgreSQL` when a database URL is configured and in
//! process memory otherwise. The session cookie is signed with a key derived
//! from `SITE_SESSION_SECRET`.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sha2::{Digest, Sha512};
use sqlx::PgPool;
use tower_sessions::{
    Expiry, MemoryStore, SessionManagerLayer, SessionStore,
    cookie::Key,
    session::{Id, Record},
    session_store,
};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::SiteConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "a2a_session";

/// Session expiry time in seconds (7 days of inactivity).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Session store selected at startup.
#[derive(Debug, Clone)]
pub enum SiteSessionStore {
    Memory(MemoryStore),
    Postgres(PostgresStore),
}

impl SiteSessionStore {
    /// In-process store; sessions are lost on restart.
    #[must_use]
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::default())
    }

    /// `PostgreSQL` store. The table is created by `a2a-labs-cli migrate`.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self::Postgres(PostgresStore::new(pool.clone()))
    }
}

#[async_trait]
impl SessionStore for SiteSessionStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        match self {
            Self::Memory(store) => store.create(record).await,
            Self::Postgres(store) => store.create(record).await,
        }
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        match self {
            Self::Memory(store) => store.save(record).await,
            Self::Postgres(store) => store.save(record).await,
        }
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        match self {
            Self::Memory(store) => store.load(session_id).await,
            Self::Postgres(store) => store.load(session_id).await,
        }
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        match self {
            Self::Memory(store) => store.delete(session_id).await,
            Self::Postgres(store) => store.delete(session_id).await,
        }
    }
}

/// Derive the cookie signing key from the session secret.
///
/// SHA-512 stretches the validated secret to the 64 bytes the cookie key
/// needs.
fn signing_key(config: &SiteConfig) -> Option<Key> {
    let digest = Sha512::digest(config.session_secret.expose_secret().as_bytes());
    Key::try_from(digest.as_slice()).ok()
}

/// Create the session layer.
#[must_use]
pub fn create_session_layer(
    store: SiteSessionStore,
    config: &SiteConfig,
) -> SessionManagerLayer<SiteSessionStore, tower_sessions::service::SignedCookie> {
    let layer = SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/");

    // A SHA-512 digest is always 64 bytes, which `Key` accepts.
    let key = signing_key(config).unwrap_or_else(Key::generate);
    layer.with_signed(key)
}
