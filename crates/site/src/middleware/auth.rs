//! Authentication extractors and session helpers.
//!
//! The signed-in user lives in the browser session under
//! [`session_keys::CURRENT_USER`]. Every read checks the record against the
//! [`AuthProvider`]: an expired record, or one issued before a backend-reported
//! sign-out, is flushed and treated as absent.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};
use crate::services::AuthProvider;

/// Sign-in page, where unauthenticated visitors are sent.
pub const SIGNIN_PATH: &str = "/signin";

/// Extractor that requires a signed-in user.
///
/// Redirects to the sign-in page otherwise.
///
/// ```rust,ignore
/// async fn protected(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.greeting_name())
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Rejection for [`RequireAuth`].
pub enum AuthRejection {
    RedirectToSignin,
    /// No session layer on the route; a wiring bug.
    MissingSession,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToSignin => Redirect::to(SIGNIN_PATH).into_response(),
            Self::MissingSession => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
    AuthProvider: FromRef<S>,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::MissingSession)?;
        let auth = AuthProvider::from_ref(state);

        current_user(session, &auth)
            .await
            .map(Self)
            .ok_or(AuthRejection::RedirectToSignin)
    }
}

/// Extractor that yields the signed-in user, if any.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
    AuthProvider: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => current_user(session, &AuthProvider::from_ref(state)).await,
            None => None,
        };
        Ok(Self(user))
    }
}

/// Read and validate the session's user.
///
/// A record that is no longer valid is flushed from the session.
pub async fn current_user(session: &Session, auth: &AuthProvider) -> Option<CurrentUser> {
    let user: CurrentUser = session
        .get(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()?;

    if auth.is_session_valid(&user).await {
        return Some(user);
    }

    tracing::info!(user_id = %user.id, "Dropping stale session");
    if let Err(e) = session.flush().await {
        tracing::warn!(error = %e, "Failed to flush stale session");
    }
    None
}

/// Store the signed-in user, rotating the session ID.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.remove_value(session_keys::ONBOARDING_COMPLETE).await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Remove the signed-in user and anything cached for them (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove_value(session_keys::CURRENT_USER).await?;
    session.remove_value(session_keys::ONBOARDING_COMPLETE).await?;
    Ok(())
}
