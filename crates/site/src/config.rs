//! Site configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SITE_BASE_URL` - Public URL for the site
//! - `SITE_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `SITE_HOST` - Bind address (default: 127.0.0.1)
//! - `SITE_PORT` - Listen port (default: 3000)
//! - `SITE_DATABASE_URL` / `DATABASE_URL` - `PostgreSQL` session store (memory store if unset)
//! - `SITE_RATE_LIMIT` - Rate limit the auth endpoints (default: true)
//! - `SITE_GUARD_ON_PROFILE_ERROR` - `open` or `onboarding` (default: open)
//! - `SITE_IDENTITY_BACKEND` - `firebase` or `memory` (default: firebase).
//!   `memory` keeps accounts and documents in process for local development
//! - `FIREBASE_API_KEY` - Web API key; the identity backend is unconfigured
//!   while this is unset or left at `demo-api-key`
//! - `FIREBASE_AUTH_DOMAIN`, `FIREBASE_PROJECT_ID`, `FIREBASE_STORAGE_BUCKET`,
//!   `FIREBASE_MESSAGING_SENDER_ID`, `FIREBASE_APP_ID` - Web app settings
//! - `FIREBASE_GOOGLE_CLIENT_ID` - OAuth client ID for the Google sign-in button
//! - `FIREBASE_AUTH_URL` - Identity Toolkit endpoint override (emulator)
//! - `FIRESTORE_URL` - Firestore endpoint override (emulator)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance trace sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::guard::ProfileFailurePolicy;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Placeholder API key baked into the web app's fallback config.
pub const DEMO_API_KEY: &str = "demo-api-key";

/// Default Identity Toolkit endpoint.
pub const DEFAULT_AUTH_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Default Firestore endpoint.
pub const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Which identity and document backends the site talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendKind {
    /// Firebase Identity Toolkit and Firestore over REST.
    #[default]
    Firebase,
    /// In-process accounts and documents, lost on restart.
    Memory,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firebase" => Ok(Self::Firebase),
            "memory" => Ok(Self::Memory),
            other => Err(format!("expected `firebase` or `memory`, got `{other}`")),
        }
    }
}

/// Site application configuration.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the site
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// `PostgreSQL` URL for persistent sessions
    pub database_url: Option<SecretString>,
    /// Whether auth endpoints are rate limited
    pub rate_limit: bool,
    /// What the route guard does when the onboarding status can't be fetched
    pub guard_on_profile_error: ProfileFailurePolicy,
    /// Identity and document backend selection
    pub backend: BackendKind,
    /// Identity and document backend settings
    pub firebase: FirebaseConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry performance trace sample rate
    pub sentry_traces_sample_rate: f32,
}

/// Firebase web app settings.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct FirebaseConfig {
    /// Web API key
    pub api_key: SecretString,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
    /// OAuth client ID for Google sign-in
    pub google_client_id: Option<String>,
    /// Identity Toolkit base URL
    pub auth_url: String,
    /// Firestore base URL. Calls are keyed by `api_key` only, so the
    /// project's rules must allow unauthenticated server access to `users`.
    pub firestore_url: String,
}

impl std::fmt::Debug for FirebaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseConfig")
            .field("api_key", &"[REDACTED]")
            .field("auth_domain", &self.auth_domain)
            .field("project_id", &self.project_id)
            .field("storage_bucket", &self.storage_bucket)
            .field("messaging_sender_id", &self.messaging_sender_id)
            .field("app_id", &self.app_id)
            .field("google_client_id", &self.google_client_id)
            .field("auth_url", &self.auth_url)
            .field("firestore_url", &self.firestore_url)
            .finish()
    }
}

impl SiteConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("SITE_HOST", "127.0.0.1")?;
        let port = parse_env("SITE_PORT", "3000")?;
        let base_url = get_required_env("SITE_BASE_URL")?;
        let session_secret = get_validated_secret("SITE_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "SITE_SESSION_SECRET")?;
        let database_url = get_database_url("SITE_DATABASE_URL");
        let rate_limit = parse_env("SITE_RATE_LIMIT", "true")?;
        let guard_on_profile_error = parse_env("SITE_GUARD_ON_PROFILE_ERROR", "open")?;
        let backend = parse_env("SITE_IDENTITY_BACKEND", "firebase")?;

        Ok(Self {
            host,
            port,
            base_url,
            session_secret,
            database_url,
            rate_limit,
            guard_on_profile_error,
            backend,
            firebase: FirebaseConfig::from_env(),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the site is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl FirebaseConfig {
    fn from_env() -> Self {
        Self {
            api_key: SecretString::from(get_env_or_default("FIREBASE_API_KEY", DEMO_API_KEY)),
            auth_domain: get_env_or_default("FIREBASE_AUTH_DOMAIN", "demo.firebaseapp.com"),
            project_id: get_env_or_default("FIREBASE_PROJECT_ID", "demo-project"),
            storage_bucket: get_env_or_default("FIREBASE_STORAGE_BUCKET", "demo.appspot.com"),
            messaging_sender_id: get_env_or_default("FIREBASE_MESSAGING_SENDER_ID", "123456789"),
            app_id: get_env_or_default("FIREBASE_APP_ID", "demo-app-id"),
            google_client_id: get_optional_env("FIREBASE_GOOGLE_CLIENT_ID"),
            auth_url: get_env_or_default("FIREBASE_AUTH_URL", DEFAULT_AUTH_URL),
            firestore_url: get_env_or_default("FIRESTORE_URL", DEFAULT_FIRESTORE_URL),
        }
    }

    /// Configuration pointing at the demo project, i.e. unconfigured.
    #[must_use]
    pub fn demo() -> Self {
        Self {
            api_key: SecretString::from(DEMO_API_KEY),
            auth_domain: "demo.firebaseapp.com".to_string(),
            project_id: "demo-project".to_string(),
            storage_bucket: "demo.appspot.com".to_string(),
            messaging_sender_id: "123456789".to_string(),
            app_id: "demo-app-id".to_string(),
            google_client_id: None,
            auth_url: DEFAULT_AUTH_URL.to_string(),
            firestore_url: DEFAULT_FIRESTORE_URL.to_string(),
        }
    }

    /// Whether real credentials are present.
    ///
    /// A missing, empty or demo API key leaves the backend unconfigured, in
    /// which case every auth operation fails fast without a network call.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        let key = self.api_key.expose_secret();
        !key.trim().is_empty() && key != DEMO_API_KEY
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|url| !url.trim().is_empty())
        .map(SecretString::from)
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
