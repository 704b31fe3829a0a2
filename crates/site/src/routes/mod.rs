//! HTTP route handlers for the site.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Landing page
//!
//! # Auth (rate limited)
//! GET  /signin                 - Sign-in page
//! POST /signin                 - Sign-in action
//! GET  /signup                 - Sign-up page
//! POST /signup                 - Sign-up action
//! POST /auth/federated         - Google sign-in (GIS redirect post, ?next=)
//! GET  /auth/reset             - Password reset page
//! POST /auth/reset             - Send password reset email
//! POST /auth/logout            - Logout
//!
//! # Onboarding (requires auth)
//! GET  /onboarding             - Current wizard step
//! POST /onboarding/identity    - Save name and username
//! GET  /onboarding/username    - Availability fragment (?username=)
//! POST /onboarding/select      - Single-choice answer
//! POST /onboarding/intent      - Toggle an intent tag
//! POST /onboarding/next        - Continue
//! POST /onboarding/back        - Back
//! POST /onboarding/finish      - Save the profile
//!
//! # Errors
//! GET  /404                    - Not-found page (also the fallback)
//! ```

pub mod auth;
pub mod errors;
pub mod home;
pub mod onboarding;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signin", get(auth::signin_page).post(auth::signin))
        .route("/signup", get(auth::signup_page).post(auth::signup))
        .route("/auth/federated", post(auth::federated))
        .route("/auth/reset", get(auth::reset_page).post(auth::reset))
        .route("/auth/logout", post(auth::logout))
}

/// Create the onboarding routes router.
pub fn onboarding_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(onboarding::show))
        .route("/identity", post(onboarding::identity))
        .route("/username", get(onboarding::username))
        .route("/select", post(onboarding::select))
        .route("/intent", post(onboarding::intent))
        .route("/next", post(onboarding::next))
        .route("/back", post(onboarding::back))
        .route("/finish", post(onboarding::finish))
}

/// Create all routes for the site.
///
/// `rate_limit` puts the auth routes behind the per-IP limiter.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    let auth = if rate_limit {
        auth_routes().layer(auth_rate_limiter())
    } else {
        auth_routes()
    };

    Router::new()
        .route("/", get(home::home))
        .merge(auth)
        .nest("/onboarding", onboarding_routes())
        .route("/404", get(errors::not_found))
        .fallback(errors::not_found)
}
