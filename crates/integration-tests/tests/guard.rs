//! Route guard behavior across the full router.
//!
//! Covers each guard state: anonymous visitors, users mid-onboarding,
//! users who finished, and what happens when the profile store is down.

#![allow(clippy::unwrap_used)]

use a2a_labs_core::UserId;
use a2a_labs_integration_tests::{TestApp, test_config};
use a2a_labs_site::guard::ProfileFailurePolicy;
use a2a_labs_site::services::profiles::USERS_COLLECTION;
use axum::http::StatusCode;
use serde_json::json;

fn mark_complete(app: &TestApp, user_id: &str) {
    let fields = json!({ "onboardingComplete": true })
        .as_object()
        .unwrap()
        .clone();
    app.documents.insert(USERS_COLLECTION, user_id, fields);
}

// =============================================================================
// Anonymous Visitors
// =============================================================================

#[tokio::test]
async fn test_anonymous_visitor_sees_landing_page() {
    let app = TestApp::new();

    let page = app.get("/").await;

    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("A2A Labs explores agent-native intelligence."));
    assert!(page.body.contains("href=\"/signin\""));
}

#[tokio::test]
async fn test_anonymous_visitor_is_sent_to_signin_from_onboarding() {
    let app = TestApp::new();

    let response = app.get("/onboarding").await;

    assert_eq!(response.redirect_target(), "/signin");
}

#[tokio::test]
async fn test_unknown_path_renders_not_found() {
    let app = TestApp::new();

    let page = app.get("/no-such-page").await;

    assert_eq!(page.status, StatusCode::NOT_FOUND);
    assert!(page.body.contains("/no-such-page"));
}

// =============================================================================
// Onboarding Users
// =============================================================================

#[tokio::test]
async fn test_incomplete_user_is_held_in_onboarding() {
    let app = TestApp::new();
    app.signup("ada@example.com", "Ada").await;

    assert_eq!(app.get("/").await.redirect_target(), "/onboarding");
    assert_eq!(app.get("/anything").await.redirect_target(), "/onboarding");
    assert_eq!(app.get("/onboarding").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_auth_pages_and_health_are_not_guarded() {
    let app = TestApp::new();
    app.signup("ada@example.com", "Ada").await;

    assert_eq!(app.get("/signin").await.status, StatusCode::OK);
    assert_eq!(app.get("/signup").await.status, StatusCode::OK);
    assert_eq!(app.get("/auth/reset").await.status, StatusCode::OK);
    assert_eq!(app.get("/health").await.status, StatusCode::OK);
    assert_eq!(app.get("/404").await.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Completed Users
// =============================================================================

#[tokio::test]
async fn test_completed_user_is_kept_out_of_onboarding() {
    let app = TestApp::new();
    app.signup("ada@example.com", "Ada").await;
    mark_complete(&app, "user-1");

    assert_eq!(app.get("/onboarding").await.redirect_target(), "/");
    assert_eq!(app.get("/onboarding/username?username=ada").await.redirect_target(), "/");

    let home = app.get("/").await;
    assert_eq!(home.status, StatusCode::OK);
    assert!(home.body.contains("Ada"));
}

#[tokio::test]
async fn test_completed_status_is_cached_in_session() {
    let app = TestApp::new();
    app.signup("ada@example.com", "Ada").await;
    mark_complete(&app, "user-1");

    app.get("/").await;
    let reads = app.documents.read_count();
    app.get("/").await;
    app.get("/").await;

    assert_eq!(app.documents.read_count(), reads);
}

// =============================================================================
// Profile Store Failures
// =============================================================================

#[tokio::test]
async fn test_status_fetch_is_retried_once() {
    let app = TestApp::new();
    app.signup("ada@example.com", "Ada").await;
    mark_complete(&app, "user-1");
    app.documents.fail_next(1);

    let home = app.get("/").await;

    assert_eq!(home.status, StatusCode::OK);
    assert_eq!(app.documents.read_count(), 2);
}

#[tokio::test]
async fn test_store_outage_fails_open_by_default() {
    let app = TestApp::new();
    app.signup("ada@example.com", "Ada").await;
    app.documents.fail_next(2);

    let home = app.get("/").await;

    assert_eq!(home.status, StatusCode::OK);
}

#[tokio::test]
async fn test_store_outage_can_hold_user_in_onboarding() {
    let mut config = test_config();
    config.guard_on_profile_error = ProfileFailurePolicy::Onboarding;
    let app = TestApp::with_config(config);
    app.signup("ada@example.com", "Ada").await;
    app.documents.fail_next(2);

    assert_eq!(app.get("/").await.redirect_target(), "/onboarding");
}

// =============================================================================
// Backend Session Changes
// =============================================================================

#[tokio::test]
async fn test_backend_sign_out_ends_browser_session() {
    let app = TestApp::new();
    app.signup("ada@example.com", "Ada").await;
    assert_eq!(app.get("/onboarding").await.status, StatusCode::OK);

    app.identity().force_sign_out(&UserId::new("user-1"));
    app.settle().await;

    assert_eq!(app.get("/onboarding").await.redirect_target(), "/signin");
    let home = app.get("/").await;
    assert_eq!(home.status, StatusCode::OK);
    assert!(home.body.contains("href=\"/signin\""));
}

#[tokio::test]
async fn test_token_expiry_ends_browser_session() {
    let app = TestApp::new();
    app.signup("ada@example.com", "Ada").await;

    app.identity().expire_token(&UserId::new("user-1"));
    app.settle().await;

    assert_eq!(app.get("/onboarding").await.redirect_target(), "/signin");
}

#[tokio::test]
async fn test_readiness_reports_resolved_auth() {
    let app = TestApp::new();
    app.settle().await;

    assert_eq!(app.get("/health/ready").await.status, StatusCode::OK);
}
