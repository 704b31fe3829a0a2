//! Authentication state provider.
//!
//! Wraps the identity backend for the whole process. Holds the loading flag
//! (true until the first session-change subscription resolves) and a record of
//! backend-reported sign-outs so stale browser sessions can be rejected.

mod error;

pub use error::AuthError;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use secrecy::SecretString;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::instrument;

use a2a_labs_core::{Email, UserId};

use crate::identity::{FederatedCredential, IdentityBackend, IdentityError, SessionChange};
use crate::models::CurrentUser;

/// Minimum password length accepted at sign-up.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// How long a backend sign-out is remembered. Longer than any session.
const REVOCATION_TTL: Duration = Duration::from_secs(31 * 24 * 60 * 60);

/// Authentication state provider.
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct AuthProvider {
    inner: Arc<AuthProviderInner>,
}

struct AuthProviderInner {
    backend: Option<Arc<dyn IdentityBackend>>,
    revocations: Cache<UserId, DateTime<Utc>>,
    loading: watch::Sender<bool>,
}

impl AuthProvider {
    /// Create a provider. `None` means the backend is unconfigured.
    #[must_use]
    pub fn new(backend: Option<Arc<dyn IdentityBackend>>) -> Self {
        let (loading, _) = watch::channel(true);
        let revocations = Cache::builder()
            .max_capacity(100_000)
            .time_to_live(REVOCATION_TTL)
            .build();

        Self {
            inner: Arc::new(AuthProviderInner {
                backend,
                revocations,
                loading,
            }),
        }
    }

    /// Provider with no backend; every operation fails fast.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self::new(None)
    }

    /// Whether an identity backend is configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.inner.backend.is_some()
    }

    /// True until the first auth-state resolution completes.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        *self.inner.loading.borrow()
    }

    /// Wait until the first auth-state resolution has completed.
    pub async fn wait_until_resolved(&self) {
        let mut rx = self.inner.loading.subscribe();
        // Err means the sender is gone, which can't happen while `self` lives.
        let _ = rx.wait_for(|loading| !*loading).await;
    }

    /// Subscribe to the backend's session changes for the process lifetime.
    ///
    /// Call once at startup. The returned task runs until the backend drops
    /// its sender; abort it on shutdown.
    #[must_use]
    pub fn spawn_session_listener(&self) -> JoinHandle<()> {
        let Some(backend) = self.inner.backend.clone() else {
            self.inner.loading.send_replace(false);
            return tokio::spawn(async {});
        };

        let mut changes = backend.subscribe();
        self.inner.loading.send_replace(false);
        let provider = self.clone();

        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => provider.apply_change(change).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Session change listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Session change stream closed");
                        break;
                    }
                }
            }
        })
    }

    async fn apply_change(&self, change: SessionChange) {
        self.inner.loading.send_replace(false);
        tracing::debug!(user_id = %change.user_id(), ?change, "Session change");

        if change.ends_session() {
            let at = change.at();
            let user_id = change.user_id().clone();
            let previous = self.inner.revocations.get(&user_id).await;
            if previous.is_none_or(|prev| prev < at) {
                self.inner.revocations.insert(user_id, at).await;
            }
        }
    }

    /// Whether a session record may still be honored.
    ///
    /// False once it has expired or the backend reported a sign-out for the
    /// user at or after the moment it was issued.
    pub async fn is_session_valid(&self, user: &CurrentUser) -> bool {
        if user.is_expired(Utc::now()) {
            return false;
        }
        match self.inner.revocations.get(&user.id).await {
            Some(revoked_at) => revoked_at < user.signed_in_at,
            None => true,
        }
    }

    fn backend(&self) -> Result<&Arc<dyn IdentityBackend>, AuthError> {
        self.inner
            .backend
            .as_ref()
            .ok_or(AuthError::BackendUnconfigured)
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Create an account, attaching a display name when one is given.
    ///
    /// A display-name update failure is logged and does not fail the sign-up;
    /// the session then carries no name.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::BackendUnconfigured` before doing anything else
    /// when no backend is configured, then validation errors, then
    /// `AuthError::Backend` for backend failures.
    #[instrument(skip(self, password, display_name))]
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<CurrentUser, AuthError> {
        let backend = self.backend()?;
        let email = Email::parse(email)?;
        validate_password(password)?;

        let mut handle = backend
            .create_account(&email, &SecretString::from(password.to_string()))
            .await
            .map_err(backend_error)?;

        if let Some(name) = display_name.map(str::trim).filter(|n| !n.is_empty()) {
            match backend.update_display_name(&handle, name).await {
                Ok(()) => handle.display_name = Some(name.to_string()),
                Err(err) => {
                    tracing::warn!(user_id = %handle.user_id, error = %err, "Failed to set display name");
                }
            }
        }

        tracing::info!(user_id = %handle.user_id, "Account created");
        Ok(CurrentUser::from_handle(&handle, Utc::now()))
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::BackendUnconfigured`, `AuthError::InvalidEmail` or
    /// `AuthError::Backend`.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<CurrentUser, AuthError> {
        let backend = self.backend()?;
        let email = Email::parse(email)?;

        let handle = backend
            .password_login(&email, &SecretString::from(password.to_string()))
            .await
            .map_err(backend_error)?;

        tracing::info!(user_id = %handle.user_id, "Signed in with password");
        Ok(CurrentUser::from_handle(&handle, Utc::now()))
    }

    /// Sign in with a federated identity provider credential.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::BackendUnconfigured` or `AuthError::Backend`.
    #[instrument(skip(self, credential), fields(provider = %credential.provider))]
    pub async fn login_with_federated_provider(
        &self,
        credential: &FederatedCredential,
    ) -> Result<CurrentUser, AuthError> {
        let backend = self.backend()?;

        let handle = backend
            .federated_login(credential)
            .await
            .map_err(backend_error)?;

        tracing::info!(user_id = %handle.user_id, "Signed in with federated provider");
        Ok(CurrentUser::from_handle(&handle, Utc::now()))
    }

    /// End the user's backend session for this browser only.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::BackendUnconfigured` or `AuthError::Backend`.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn logout(&self, user: &CurrentUser) -> Result<(), AuthError> {
        let backend = self.backend()?;
        backend.logout(&user.id).await.map_err(backend_error)?;
        tracing::info!("Signed out");
        Ok(())
    }

    /// Ask the backend to email a password reset link.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::BackendUnconfigured`, `AuthError::InvalidEmail` or
    /// `AuthError::Backend`.
    #[instrument(skip(self))]
    pub async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        let backend = self.backend()?;
        let email = Email::parse(email)?;
        backend
            .send_password_reset(&email)
            .await
            .map_err(backend_error)
    }
}

fn backend_error(err: IdentityError) -> AuthError {
    match &err {
        IdentityError::Rejected { code, .. } => {
            tracing::info!(code = %code, "Identity backend rejected request");
        }
        IdentityError::Http(_) | IdentityError::Parse(_) => {
            tracing::error!(error = %err, "Identity backend failure");
        }
    }
    AuthError::Backend {
        message: err.user_message(),
    }
}

/// Validate password length.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    Ok(())
}
