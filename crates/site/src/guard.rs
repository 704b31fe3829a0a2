//! Route guard state machine.
//!
//! Decides, per navigation, whether a guarded page renders or the visitor is
//! redirected. The machine itself is pure; `middleware::guard` feeds it the
//! session and onboarding status of the request.
//!
//! ```text
//! Resolving ──no session──▶ Unauthenticated
//!     │
//!     └──session──▶ AuthenticatedNoProfile ──incomplete──▶ AuthenticatedOnboarding
//!                               │
//!                               └──complete──▶ AuthenticatedComplete
//! ```

use std::fmt;
use std::str::FromStr;

/// Path of the onboarding wizard.
pub const ONBOARDING_PATH: &str = "/onboarding";

/// Path of the landing page.
pub const HOME_PATH: &str = "/";

/// Guard state for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// Auth state not yet known.
    Resolving,
    /// No session.
    Unauthenticated,
    /// Session exists; onboarding status not known (or unavailable).
    AuthenticatedNoProfile,
    /// Session exists; onboarding not complete.
    AuthenticatedOnboarding,
    /// Session exists; onboarding complete.
    AuthenticatedComplete,
}

/// Result of fetching the onboarding-complete flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileStatus {
    Complete,
    Incomplete,
    /// The document store couldn't be read.
    Unavailable,
}

/// What to do when the onboarding status can't be fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProfileFailurePolicy {
    /// Render the requested page.
    #[default]
    FailOpen,
    /// Treat the user as still onboarding.
    Onboarding,
}

impl FromStr for ProfileFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::FailOpen),
            "onboarding" => Ok(Self::Onboarding),
            other => Err(format!("expected `open` or `onboarding`, got `{other}`")),
        }
    }
}

impl fmt::Display for ProfileFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FailOpen => "open",
            Self::Onboarding => "onboarding",
        })
    }
}

/// Guard verdict for a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Render,
    Redirect(&'static str),
}

impl GuardState {
    /// Apply the auth resolution. Only meaningful from `Resolving`.
    #[must_use]
    pub const fn on_session(self, has_session: bool) -> Self {
        match self {
            Self::Resolving if has_session => Self::AuthenticatedNoProfile,
            Self::Resolving => Self::Unauthenticated,
            other => other,
        }
    }

    /// Apply the onboarding status. Only meaningful from
    /// `AuthenticatedNoProfile`.
    #[must_use]
    pub const fn on_profile_status(self, status: ProfileStatus, policy: ProfileFailurePolicy) -> Self {
        match (self, status, policy) {
            (Self::AuthenticatedNoProfile, ProfileStatus::Complete, _) => {
                Self::AuthenticatedComplete
            }
            (Self::AuthenticatedNoProfile, ProfileStatus::Incomplete, _)
            | (
                Self::AuthenticatedNoProfile,
                ProfileStatus::Unavailable,
                ProfileFailurePolicy::Onboarding,
            ) => Self::AuthenticatedOnboarding,
            (other, _, _) => other,
        }
    }

    /// Decide what happens to a navigation to `path`.
    ///
    /// Callers resolve the state first; `Resolving` never redirects.
    #[must_use]
    pub fn decide(self, path: &str) -> GuardDecision {
        match self {
            Self::AuthenticatedOnboarding if !is_onboarding_path(path) => {
                GuardDecision::Redirect(ONBOARDING_PATH)
            }
            Self::AuthenticatedComplete if is_onboarding_path(path) => {
                GuardDecision::Redirect(HOME_PATH)
            }
            _ => GuardDecision::Render,
        }
    }
}

/// Whether `path` belongs to the onboarding wizard.
#[must_use]
pub fn is_onboarding_path(path: &str) -> bool {
    path == ONBOARDING_PATH
        || path
            .strip_prefix(ONBOARDING_PATH)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Whether navigations to `path` go through the guard.
///
/// Auth pages, static assets, health checks and the explicit 404 page are
/// never guarded.
#[must_use]
pub fn is_guarded(path: &str) -> bool {
    const EXACT: &[&str] = &["/signin", "/signup", "/404", "/health"];
    const PREFIXES: &[&str] = &["/auth/", "/static/", "/health/"];

    !(EXACT.contains(&path) || PREFIXES.iter().any(|p| path.starts_with(p)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPEN: ProfileFailurePolicy = ProfileFailurePolicy::FailOpen;

    fn authenticated(status: ProfileStatus, policy: ProfileFailurePolicy) -> GuardState {
        GuardState::Resolving
            .on_session(true)
            .on_profile_status(status, policy)
    }

    #[test]
    fn test_session_resolution() {
        assert_eq!(
            GuardState::Resolving.on_session(false),
            GuardState::Unauthenticated
        );
        assert_eq!(
            GuardState::Resolving.on_session(true),
            GuardState::AuthenticatedNoProfile
        );
        // Other states ignore session events.
        assert_eq!(
            GuardState::AuthenticatedComplete.on_session(false),
            GuardState::AuthenticatedComplete
        );
    }

    #[test]
    fn test_incomplete_profile_redirects_home_to_onboarding() {
        let state = authenticated(ProfileStatus::Incomplete, OPEN);
        assert_eq!(state, GuardState::AuthenticatedOnboarding);
        assert_eq!(state.decide("/"), GuardDecision::Redirect("/onboarding"));
        assert_eq!(state.decide("/onboarding"), GuardDecision::Render);
        assert_eq!(state.decide("/onboarding/next"), GuardDecision::Render);
        assert_eq!(
            state.decide("/does-not-exist"),
            GuardDecision::Redirect("/onboarding")
        );
    }

    #[test]
    fn test_complete_profile_redirects_onboarding_home() {
        let state = authenticated(ProfileStatus::Complete, OPEN);
        assert_eq!(state, GuardState::AuthenticatedComplete);
        assert_eq!(state.decide("/onboarding"), GuardDecision::Redirect("/"));
        assert_eq!(state.decide("/onboarding/select"), GuardDecision::Redirect("/"));
        assert_eq!(state.decide("/"), GuardDecision::Render);
    }

    #[test]
    fn test_unauthenticated_never_forced() {
        let state = GuardState::Resolving.on_session(false);
        assert_eq!(state.decide("/"), GuardDecision::Render);
        assert_eq!(state.decide("/onboarding"), GuardDecision::Render);
    }

    #[test]
    fn test_profile_failure_policies() {
        let open = authenticated(ProfileStatus::Unavailable, OPEN);
        assert_eq!(open, GuardState::AuthenticatedNoProfile);
        assert_eq!(open.decide("/"), GuardDecision::Render);
        assert_eq!(open.decide("/onboarding"), GuardDecision::Render);

        let strict = authenticated(
            ProfileStatus::Unavailable,
            ProfileFailurePolicy::Onboarding,
        );
        assert_eq!(strict, GuardState::AuthenticatedOnboarding);
        assert_eq!(strict.decide("/"), GuardDecision::Redirect("/onboarding"));
    }

    #[test]
    fn test_onboarding_path_matching() {
        assert!(is_onboarding_path("/onboarding"));
        assert!(is_onboarding_path("/onboarding/finish"));
        assert!(!is_onboarding_path("/onboardingx"));
        assert!(!is_onboarding_path("/"));
    }

    #[test]
    fn test_unguarded_paths() {
        for path in ["/signin", "/signup", "/auth/reset", "/static/css/main.css", "/health", "/health/ready", "/404"] {
            assert!(!is_guarded(path), "{path} should not be guarded");
        }
        for path in ["/", "/onboarding", "/onboarding/next", "/missing"] {
            assert!(is_guarded(path), "{path} should be guarded");
        }
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("open".parse::<ProfileFailurePolicy>(), Ok(ProfileFailurePolicy::FailOpen));
        assert_eq!(" Onboarding ".parse::<ProfileFailurePolicy>(), Ok(ProfileFailurePolicy::Onboarding));
        assert!("closed".parse::<ProfileFailurePolicy>().is_err());
        assert_eq!(ProfileFailurePolicy::default().to_string(), "open");
    }
}
