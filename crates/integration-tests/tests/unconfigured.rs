//! Behavior when no identity backend credentials are configured.

#![allow(clippy::unwrap_used)]

use a2a_labs_integration_tests::TestApp;
use axum::http::StatusCode;

const UNCONFIGURED: &str = "Firebase is not configured. Please set up your Firebase credentials.";

#[tokio::test]
async fn test_pages_render_with_notice() {
    let app = TestApp::unconfigured();

    assert_eq!(app.get("/").await.status, StatusCode::OK);
    for path in ["/signin", "/signup", "/auth/reset"] {
        let page = app.get(path).await;
        assert_eq!(page.status, StatusCode::OK);
        assert!(page.body.contains("Firebase is not configured."), "{path}");
    }
}

#[tokio::test]
async fn test_signin_fails_fast() {
    let app = TestApp::unconfigured();

    let response = app.signin("ada@example.com").await;
    assert_eq!(response.redirect_target(), "/signin");

    let page = app.follow(&response).await;
    assert!(page.body.contains(UNCONFIGURED));
}

#[tokio::test]
async fn test_signup_and_reset_fail_fast() {
    let app = TestApp::unconfigured();

    let response = app.signup("ada@example.com", "Ada").await;
    assert_eq!(response.redirect_target(), "/signup");
    assert!(app.follow(&response).await.body.contains(UNCONFIGURED));

    let response = app.post("/auth/reset", &[("email", "ada@example.com")]).await;
    assert_eq!(response.redirect_target(), "/auth/reset");
    assert!(app.follow(&response).await.body.contains(UNCONFIGURED));
}

#[tokio::test]
async fn test_onboarding_still_requires_signin() {
    let app = TestApp::unconfigured();

    assert_eq!(app.get("/onboarding").await.redirect_target(), "/signin");
    assert_eq!(app.get("/health/ready").await.status, StatusCode::OK);
}
