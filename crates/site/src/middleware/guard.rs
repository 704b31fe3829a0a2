//! Route guard middleware.
//!
//! Runs the [`GuardState`] machine for every guarded navigation: waits for
//! auth to resolve, reads the session, fetches the onboarding status and
//! either passes the request on or redirects.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use a2a_labs_core::UserId;

use super::auth::current_user;
use crate::guard::{GuardDecision, GuardState, ProfileStatus, is_guarded};
use crate::models::session_keys;
use crate::state::AppState;

/// Guard guarded paths; pass everything else straight through.
pub async fn route_guard(
    State(state): State<AppState>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    if !is_guarded(&path) {
        return next.run(request).await;
    }

    let auth = state.auth();
    auth.wait_until_resolved().await;

    let user = current_user(&session, auth).await;
    let mut guard = GuardState::Resolving.on_session(user.is_some());

    if let Some(user) = &user {
        let status = profile_status(&state, &session, &user.id).await;
        guard = guard.on_profile_status(status, state.config().guard_on_profile_error);
    }

    match guard.decide(&path) {
        GuardDecision::Render => next.run(request).await,
        GuardDecision::Redirect(to) => {
            tracing::debug!(from = %path, to, state = ?guard, "Guard redirect");
            Redirect::to(to).into_response()
        }
    }
}

/// Onboarding status for `user_id`.
///
/// A completed status is cached in the session, since it never reverts. The
/// store is read at most twice per request.
async fn profile_status(state: &AppState, session: &Session, user_id: &UserId) -> ProfileStatus {
    let cached: Option<bool> = session
        .get(session_keys::ONBOARDING_COMPLETE)
        .await
        .ok()
        .flatten();
    if cached == Some(true) {
        return ProfileStatus::Complete;
    }

    let profiles = state.profiles();
    let fetched = match profiles.onboarding_complete(user_id).await {
        Ok(complete) => Ok(complete),
        Err(first) => {
            tracing::warn!(%user_id, error = %first, "Onboarding status fetch failed; retrying");
            profiles.onboarding_complete(user_id).await
        }
    };

    match fetched {
        Ok(true) => {
            if let Err(e) = session.insert(session_keys::ONBOARDING_COMPLETE, true).await {
                tracing::warn!(error = %e, "Failed to cache onboarding status");
            }
            ProfileStatus::Complete
        }
        Ok(false) => ProfileStatus::Incomplete,
        Err(e) => {
            tracing::error!(
                %user_id,
                error = %e,
                policy = %state.config().guard_on_profile_error,
                "Onboarding status unavailable"
            );
            ProfileStatus::Unavailable
        }
    }
}
