//! Per-user wizard state cache.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tokio::sync::Mutex;

use a2a_labs_core::UserId;

use super::{OnboardingError, WizardState};
use crate::documents::DocumentError;

/// Wizard state shared by concurrent requests from one user.
pub type SharedWizard = Arc<Mutex<WizardState>>;

/// Idle time after which an abandoned wizard is dropped.
const WIZARD_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Upper bound on wizards held at once.
const MAX_WIZARDS: u64 = 10_000;

/// In-process store of wizard state keyed by user.
#[derive(Clone)]
pub struct WizardStore {
    cache: Cache<UserId, SharedWizard>,
}

impl Default for WizardStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(MAX_WIZARDS)
                .time_to_idle(WIZARD_IDLE_TIMEOUT)
                .build(),
        }
    }

    /// The user's wizard, created with `init` on first use.
    ///
    /// Concurrent first requests share one `init` call.
    ///
    /// # Errors
    ///
    /// Returns `OnboardingError::Load` if `init` fails; nothing is cached.
    pub async fn get_or_init<F>(&self, user_id: &UserId, init: F) -> Result<SharedWizard, OnboardingError>
    where
        F: Future<Output = Result<WizardState, DocumentError>>,
    {
        self.cache
            .try_get_with(user_id.clone(), async move {
                init.await.map(|state| Arc::new(Mutex::new(state)))
            })
            .await
            .map_err(OnboardingError::Load)
    }

    /// The user's wizard if one exists.
    pub async fn get(&self, user_id: &UserId) -> Option<SharedWizard> {
        self.cache.get(user_id).await
    }

    /// Drop the user's wizard (on finish or logout).
    pub async fn discard(&self, user_id: &UserId) {
        self.cache.invalidate(user_id).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::onboarding::Step;

    #[tokio::test]
    async fn test_init_runs_once_per_user() {
        let store = WizardStore::new();
        let user = UserId::new("u1");

        let first = store
            .get_or_init(&user, async { Ok(WizardState::new()) })
            .await
            .unwrap();
        first.lock().await.next_step();

        let second = store
            .get_or_init(&user, async {
                Err(DocumentError::Parse("should not run".to_string()))
            })
            .await
            .unwrap();
        assert_eq!(second.lock().await.step(), Step::Role);
    }

    #[tokio::test]
    async fn test_failed_init_is_not_cached() {
        let store = WizardStore::new();
        let user = UserId::new("u1");

        let err = store
            .get_or_init(&user, async {
                Err(DocumentError::Api {
                    status: 503,
                    message: "down".to_string(),
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, OnboardingError::Load(_)));
        assert!(store.get(&user).await.is_none());

        store
            .get_or_init(&user, async { Ok(WizardState::new()) })
            .await
            .unwrap();
        assert!(store.get(&user).await.is_some());
    }

    #[tokio::test]
    async fn test_discard_forgets_state() {
        let store = WizardStore::new();
        let user = UserId::new("u1");
        store
            .get_or_init(&user, async { Ok(WizardState::new()) })
            .await
            .unwrap();

        store.discard(&user).await;
        assert!(store.get(&user).await.is_none());
    }
}
