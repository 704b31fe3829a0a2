//! Identity backend adapter.
//!
//! Account creation, credential and federated login, logout, password reset
//! and session-change notifications. The site never stores passwords; it
//! delegates to an [`IdentityBackend`]:
//!
//! - [`FirebaseIdentity`] - Firebase Identity Toolkit REST API
//! - [`InMemoryIdentity`] - in-process accounts for local development and tests

mod firebase;
mod memory;

pub use firebase::FirebaseIdentity;
pub use memory::InMemoryIdentity;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use thiserror::Error;
use tokio::sync::broadcast;

use a2a_labs_core::{Email, UserId};

/// Capacity of the session-change broadcast channel.
pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Provider ID for Google sign-in.
pub const GOOGLE_PROVIDER_ID: &str = "google.com";

/// A signed-in account as reported by the backend.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub user_id: UserId,
    pub email: Option<Email>,
    pub display_name: Option<String>,
    /// Backend ID token, needed for follow-up account updates.
    pub id_token: SecretString,
}

/// Credential issued by a federated identity provider.
#[derive(Debug, Clone)]
pub struct FederatedCredential {
    /// Provider ID, e.g. `google.com`.
    pub provider: String,
    /// The provider's ID token (JWT).
    pub id_token: SecretString,
}

impl FederatedCredential {
    /// Credential from a Google Identity Services ID token.
    #[must_use]
    pub fn google(id_token: impl Into<String>) -> Self {
        Self {
            provider: GOOGLE_PROVIDER_ID.to_string(),
            id_token: SecretString::from(id_token.into()),
        }
    }
}

/// Session lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    SignedIn { user_id: UserId, at: DateTime<Utc> },
    SignedOut { user_id: UserId, at: DateTime<Utc> },
    TokenExpired { user_id: UserId, at: DateTime<Utc> },
}

impl SessionChange {
    /// The user the change applies to.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        match self {
            Self::SignedIn { user_id, .. }
            | Self::SignedOut { user_id, .. }
            | Self::TokenExpired { user_id, .. } => user_id,
        }
    }

    /// Whether sessions for this user issued before the change are dead.
    #[must_use]
    pub const fn ends_session(&self) -> bool {
        matches!(self, Self::SignedOut { .. } | Self::TokenExpired { .. })
    }

    /// When the change happened.
    #[must_use]
    pub const fn at(&self) -> DateTime<Utc> {
        match self {
            Self::SignedIn { at, .. } | Self::SignedOut { at, .. } | Self::TokenExpired { at, .. } => {
                *at
            }
        }
    }
}

/// Errors returned by an identity backend.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The backend refused the request.
    #[error("identity backend rejected request: {code}")]
    Rejected { code: String, message: String },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl IdentityError {
    /// Build a rejection from a backend error string such as
    /// `WEAK_PASSWORD : Password should be at least 6 characters`.
    #[must_use]
    pub fn rejected(raw: &str) -> Self {
        let (code, detail) = raw
            .split_once(" : ")
            .map_or((raw.trim(), None), |(code, detail)| {
                (code.trim(), Some(detail.trim()))
            });

        let message = match code {
            "EMAIL_EXISTS" => "An account with this email already exists.".to_string(),
            "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
                "Invalid email or password.".to_string()
            }
            "USER_DISABLED" => "This account has been disabled.".to_string(),
            "INVALID_EMAIL" => "Please enter a valid email address.".to_string(),
            "WEAK_PASSWORD" => "Password should be at least 6 characters.".to_string(),
            "TOO_MANY_ATTEMPTS_TRY_LATER" => {
                "Too many attempts. Please try again later.".to_string()
            }
            "OPERATION_NOT_ALLOWED" => "This sign-in method is not enabled.".to_string(),
            "INVALID_IDP_RESPONSE" => "Google sign-in failed. Please try again.".to_string(),
            "TOKEN_EXPIRED" | "INVALID_ID_TOKEN" | "USER_NOT_FOUND" => {
                "Your session has expired. Please sign in again.".to_string()
            }
            _ => detail.map_or_else(|| code.to_string(), str::to_string),
        };

        Self::Rejected {
            code: code.to_string(),
            message,
        }
    }

    /// Message safe to show to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            Self::Http(_) => {
                "Unable to reach the authentication service. Please try again.".to_string()
            }
            Self::Parse(_) => "Unexpected response from the authentication service.".to_string(),
        }
    }

    /// Whether the backend says the account's token is no longer usable.
    #[must_use]
    pub fn is_token_expired(&self) -> bool {
        matches!(
            self,
            Self::Rejected { code, .. }
                if matches!(code.as_str(), "TOKEN_EXPIRED" | "INVALID_ID_TOKEN" | "USER_NOT_FOUND" | "USER_DISABLED")
        )
    }
}

/// External identity service.
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Create an account and sign it in.
    async fn create_account(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<SessionHandle, IdentityError>;

    /// Attach a display name to a freshly created account.
    async fn update_display_name(
        &self,
        session: &SessionHandle,
        display_name: &str,
    ) -> Result<(), IdentityError>;

    /// Sign in with email and password.
    async fn password_login(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<SessionHandle, IdentityError>;

    /// Sign in with a federated provider credential.
    async fn federated_login(
        &self,
        credential: &FederatedCredential,
    ) -> Result<SessionHandle, IdentityError>;

    /// End the calling browser's session.
    ///
    /// Must not publish a session change: other browsers signed in as the
    /// same user stay signed in.
    async fn logout(&self, user_id: &UserId) -> Result<(), IdentityError>;

    /// Send a password reset email.
    async fn send_password_reset(&self, email: &Email) -> Result<(), IdentityError>;

    /// Subscribe to session-change notifications.
    fn subscribe(&self) -> broadcast::Receiver<SessionChange>;
}
