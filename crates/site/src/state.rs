//! Application state shared across handlers.

use std::sync::Arc;

use axum::extract::FromRef;

use crate::config::{BackendKind, SiteConfig};
use crate::documents::{DocumentStore, FirestoreStore, InMemoryDocumentStore};
use crate::identity::{FirebaseIdentity, IdentityBackend, InMemoryIdentity};
use crate::onboarding::WizardStore;
use crate::services::{AuthProvider, ProfileService};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: SiteConfig,
    auth: AuthProvider,
    profiles: ProfileService,
    wizards: WizardStore,
}

/// Backends the state is assembled from.
pub struct Backends {
    /// `None` leaves authentication unconfigured.
    pub identity: Option<Arc<dyn IdentityBackend>>,
    pub documents: Arc<dyn DocumentStore>,
}

impl Backends {
    /// Pick backends from configuration.
    ///
    /// `memory` always gets in-process backends. `firebase` gets the REST
    /// clients when real credentials are present; without them auth is
    /// unconfigured and documents stay in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client can't be built or an endpoint URL
    /// is invalid.
    pub fn from_config(config: &SiteConfig) -> Result<Self, BackendSetupError> {
        match config.backend {
            BackendKind::Memory => {
                tracing::warn!("Using in-memory identity and document backends");
                Ok(Self::in_memory())
            }
            BackendKind::Firebase if config.firebase.is_configured() => Ok(Self {
                identity: Some(Arc::new(FirebaseIdentity::new(
                    &config.firebase,
                    &config.base_url,
                )?)),
                documents: Arc::new(FirestoreStore::new(&config.firebase)?),
            }),
            BackendKind::Firebase => {
                tracing::warn!(
                    "Firebase is not configured; sign-in is disabled until FIREBASE_API_KEY is set"
                );
                Ok(Self {
                    identity: None,
                    documents: Arc::new(InMemoryDocumentStore::new()),
                })
            }
        }
    }

    /// Fresh in-process backends.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            identity: Some(Arc::new(InMemoryIdentity::new())),
            documents: Arc::new(InMemoryDocumentStore::new()),
        }
    }
}

/// Error assembling backends at startup.
#[derive(Debug, thiserror::Error)]
pub enum BackendSetupError {
    #[error("identity backend: {0}")]
    Identity(#[from] crate::identity::IdentityError),
    #[error("document store: {0}")]
    Documents(#[from] crate::documents::DocumentError),
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: SiteConfig, backends: Backends) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                auth: AuthProvider::new(backends.identity),
                profiles: ProfileService::new(backends.documents),
                wizards: WizardStore::new(),
            }),
        }
    }

    /// Get a reference to the site configuration.
    #[must_use]
    pub fn config(&self) -> &SiteConfig {
        &self.inner.config
    }

    /// Get the authentication state provider.
    #[must_use]
    pub fn auth(&self) -> &AuthProvider {
        &self.inner.auth
    }

    /// Get the profile service.
    #[must_use]
    pub fn profiles(&self) -> &ProfileService {
        &self.inner.profiles
    }

    /// Get the per-user wizard store.
    #[must_use]
    pub fn wizards(&self) -> &WizardStore {
        &self.inner.wizards
    }
}

impl FromRef<AppState> for AuthProvider {
    fn from_ref(state: &AppState) -> Self {
        state.inner.auth.clone()
    }
}
