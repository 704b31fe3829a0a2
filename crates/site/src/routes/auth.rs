//! Authentication route handlers.
//!
//! Sign-in, sign-up, Google sign-in, password reset and logout. Every
//! outcome is reported as a flash toast followed by a redirect, so no
//! pending state survives a failed request.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::{Session, cookie::Cookie};
use tracing::instrument;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::guard::{HOME_PATH, ONBOARDING_PATH};
use crate::identity::FederatedCredential;
use crate::middleware::{
    Flash, Flashes, OptionalAuth, clear_current_user, push_flash, set_current_user,
};
use crate::models::CurrentUser;
use crate::services::auth::MIN_PASSWORD_LENGTH;
use crate::state::AppState;

/// Cookie Google Identity Services sets for its double-submit CSRF check.
const GIS_CSRF_COOKIE: &str = "g_csrf_token";

// =============================================================================
// Form Types
// =============================================================================

/// Sign-in form data.
#[derive(Debug, Deserialize)]
pub struct SigninForm {
    pub email: String,
    pub password: String,
}

/// Sign-up form data.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub display_name: String,
    pub email: String,
    pub password: String,
}

/// Password reset form data.
#[derive(Debug, Deserialize)]
pub struct ResetForm {
    pub email: String,
}

/// Google Identity Services redirect-mode post.
#[derive(Debug, Deserialize)]
pub struct FederatedForm {
    /// Google ID token.
    pub credential: String,
    pub g_csrf_token: String,
}

/// Where to go after federated sign-in.
#[derive(Debug, Deserialize)]
pub struct FederatedQuery {
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Settings for the "Sign in with Google" button.
pub struct GoogleButton {
    pub client_id: String,
    /// Absolute `login_uri` the button posts to.
    pub login_uri: String,
}

/// Sign-in page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signin.html")]
pub struct SigninTemplate {
    pub user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
    pub configured: bool,
    pub google: Option<GoogleButton>,
}

/// Sign-up page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
    pub configured: bool,
    pub google: Option<GoogleButton>,
    pub min_password_length: usize,
}

/// Password reset page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset.html")]
pub struct ResetTemplate {
    pub user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
    pub configured: bool,
}

fn google_button(state: &AppState, next: &str) -> Option<GoogleButton> {
    let client_id = state.config().firebase.google_client_id.clone()?;
    let base = state.config().base_url.trim_end_matches('/');
    Some(GoogleButton {
        client_id,
        login_uri: format!("{base}/auth/federated?next={}", urlencoding::encode(next)),
    })
}

// =============================================================================
// Sign In
// =============================================================================

/// Display the sign-in page.
pub async fn signin_page(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Flashes(flashes): Flashes,
) -> impl IntoResponse {
    SigninTemplate {
        user,
        flashes,
        configured: state.auth().is_configured(),
        google: google_button(&state, HOME_PATH),
    }
}

/// Handle sign-in form submission.
#[instrument(skip_all)]
pub async fn signin(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SigninForm>,
) -> Response {
    match state.auth().login(&form.email, &form.password).await {
        Ok(user) => {
            start_session(&session, &user, "Welcome back to A2A Labs!", HOME_PATH, "/signin").await
        }
        Err(e) => {
            push_flash(&session, Flash::error(e.to_string())).await;
            Redirect::to("/signin").into_response()
        }
    }
}

// =============================================================================
// Sign Up
// =============================================================================

/// Display the sign-up page.
pub async fn signup_page(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Flashes(flashes): Flashes,
) -> impl IntoResponse {
    SignupTemplate {
        user,
        flashes,
        configured: state.auth().is_configured(),
        google: google_button(&state, ONBOARDING_PATH),
        min_password_length: MIN_PASSWORD_LENGTH,
    }
}

/// Handle sign-up form submission.
///
/// New accounts go straight to onboarding.
#[instrument(skip_all)]
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignupForm>,
) -> Response {
    let display_name = Some(form.display_name.as_str());
    match state
        .auth()
        .signup(&form.email, &form.password, display_name)
        .await
    {
        Ok(user) => {
            start_session(&session, &user, "Welcome to A2A Labs!", ONBOARDING_PATH, "/signup").await
        }
        Err(e) => {
            push_flash(&session, Flash::error(e.to_string())).await;
            Redirect::to("/signup").into_response()
        }
    }
}

// =============================================================================
// Federated Sign In
// =============================================================================

/// Handle the Google sign-in post.
///
/// The `next` query parameter selects the landing page: `/onboarding` when
/// started from sign-up, `/` otherwise.
#[instrument(skip_all)]
pub async fn federated(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Query(query): Query<FederatedQuery>,
    Form(form): Form<FederatedForm>,
) -> Response {
    let next = match query.next.as_deref() {
        Some(ONBOARDING_PATH) => ONBOARDING_PATH,
        _ => HOME_PATH,
    };
    let origin = if next == ONBOARDING_PATH { "/signup" } else { "/signin" };

    if !gis_csrf_matches(&headers, &form.g_csrf_token) {
        tracing::warn!("Google sign-in post failed the CSRF check");
        push_flash(&session, Flash::error("Google sign-in failed. Please try again.")).await;
        return Redirect::to(origin).into_response();
    }

    let credential = FederatedCredential::google(form.credential);
    match state.auth().login_with_federated_provider(&credential).await {
        Ok(user) => start_session(&session, &user, "Welcome to A2A Labs!", next, origin).await,
        Err(e) => {
            push_flash(&session, Flash::error(e.to_string())).await;
            Redirect::to(origin).into_response()
        }
    }
}

/// Double-submit check: the posted token must equal the GIS cookie.
fn gis_csrf_matches(headers: &HeaderMap, posted: &str) -> bool {
    if posted.is_empty() {
        return false;
    }
    headers
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .any(|c| c.name() == GIS_CSRF_COOKIE && c.value() == posted)
}

// =============================================================================
// Password Reset
// =============================================================================

/// Display the password reset page.
pub async fn reset_page(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Flashes(flashes): Flashes,
) -> impl IntoResponse {
    ResetTemplate {
        user,
        flashes,
        configured: state.auth().is_configured(),
    }
}

/// Handle password reset form submission.
#[instrument(skip_all)]
pub async fn reset(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ResetForm>,
) -> Response {
    match state.auth().reset_password(&form.email).await {
        Ok(()) => {
            push_flash(
                &session,
                Flash::success("Password reset email sent! Check your inbox."),
            )
            .await;
            Redirect::to("/signin").into_response()
        }
        Err(e) => {
            push_flash(&session, Flash::error(e.to_string())).await;
            Redirect::to("/auth/reset").into_response()
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
///
/// The browser session is cleared even if the backend call fails.
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Response {
    if let Some(user) = &user {
        if let Err(e) = state.auth().logout(user).await {
            tracing::warn!(user_id = %user.id, error = %e, "Backend logout failed");
        }
        state.wizards().discard(&user.id).await;
    }

    if let Err(e) = clear_current_user(&session).await {
        tracing::error!(error = %e, "Failed to clear session");
    }
    if let Err(e) = session.cycle_id().await {
        tracing::warn!(error = %e, "Failed to rotate session ID");
    }
    clear_sentry_user();

    Redirect::to(HOME_PATH).into_response()
}

// =============================================================================
// Helpers
// =============================================================================

/// Store the user in the session, queue the welcome toast and redirect.
async fn start_session(
    session: &Session,
    user: &CurrentUser,
    welcome: &str,
    next: &str,
    on_failure: &str,
) -> Response {
    if let Err(e) = set_current_user(session, user).await {
        tracing::error!(user_id = %user.id, error = %e, "Failed to store session");
        push_flash(session, Flash::error("Sign-in failed. Please try again.")).await;
        return Redirect::to(on_failure).into_response();
    }

    set_sentry_user(&user.id, user.email.as_ref().map(a2a_labs_core::Email::as_str));
    push_flash(session, Flash::success(welcome)).await;
    Redirect::to(next).into_response()
}
