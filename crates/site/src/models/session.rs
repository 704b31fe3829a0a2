//! Session-related types.
//!
//! Types stored in the browser session for authentication state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use a2a_labs_core::{Email, UserId};

use crate::identity::SessionHandle;

/// Absolute lifetime of a sign-in, independent of cookie inactivity expiry.
pub const SESSION_MAX_AGE_DAYS: i64 = 30;

/// Session-stored user identity.
///
/// Presence in the session means the visitor is authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Identity backend user ID.
    pub id: UserId,
    /// Account email, absent for some federated accounts.
    pub email: Option<Email>,
    /// Display name, if the account has one.
    pub display_name: Option<String>,
    /// When this sign-in happened.
    pub signed_in_at: DateTime<Utc>,
    /// When this sign-in stops being honored.
    pub expires_at: DateTime<Utc>,
}

impl CurrentUser {
    /// Session record for a fresh sign-in.
    #[must_use]
    pub fn from_handle(handle: &SessionHandle, now: DateTime<Utc>) -> Self {
        Self {
            id: handle.user_id.clone(),
            email: handle.email.clone(),
            display_name: handle.display_name.clone(),
            signed_in_at: now,
            expires_at: now + Duration::days(SESSION_MAX_AGE_DAYS),
        }
    }

    /// Whether the sign-in has outlived `expires_at`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Name to greet the user with.
    #[must_use]
    pub fn greeting_name(&self) -> &str {
        self.display_name
            .as_deref()
            .or_else(|| self.email.as_ref().map(Email::local_part))
            .unwrap_or("there")
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for caching a confirmed `onboardingComplete = true`.
    pub const ONBOARDING_COMPLETE: &str = "onboarding_complete";

    /// Key for pending flash notifications.
    pub const FLASHES: &str = "flashes";
}
