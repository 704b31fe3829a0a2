//! The nine-step onboarding wizard driven through its HTTP actions.

#![allow(clippy::unwrap_used)]

use a2a_labs_integration_tests::TestApp;
use a2a_labs_site::services::profiles::USERS_COLLECTION;
use axum::http::StatusCode;
use serde_json::{Value, json};

async fn signed_up() -> TestApp {
    let app = TestApp::new();
    app.signup("ada@example.com", "Ada Lovelace").await;
    app
}

fn seed(app: &TestApp, user_id: &str, fields: &Value) {
    app.documents
        .insert(USERS_COLLECTION, user_id, fields.as_object().unwrap().clone());
}

async fn complete_identity(app: &TestApp, username: &str) {
    let response = app
        .post(
            "/onboarding/identity",
            &[
                ("full_name", "Ada Lovelace"),
                ("username", username),
                ("advance", "1"),
            ],
        )
        .await;
    assert_eq!(response.redirect_target(), "/onboarding");
}

/// Answer steps 2 through 8.
async fn answer_choices(app: &TestApp) {
    app.post("/onboarding/select", &[("value", "engineer")]).await;
    app.post("/onboarding/select", &[("value", "2-10")]).await;
    app.post("/onboarding/intent", &[("intent", "build_agents")]).await;
    app.post("/onboarding/intent", &[("intent", "research")]).await;
    app.post("/onboarding/next", &[]).await;
    app.post("/onboarding/select", &[("value", "this_quarter")]).await;
    app.post("/onboarding/select", &[("value", "developer")]).await;
    app.post("/onboarding/select", &[("value", "referral")]).await;
    app.post("/onboarding/select", &[("value", "reliability")]).await;
}

// =============================================================================
// Full Flow
// =============================================================================

#[tokio::test]
async fn test_full_flow_saves_profile_and_releases_user() {
    let app = signed_up().await;

    complete_identity(&app, "ada").await;
    assert!(app.get("/onboarding").await.body.contains("Step 2 of 9"));

    answer_choices(&app).await;
    let review = app.get("/onboarding").await;
    assert!(review.body.contains("Step 9 of 9"));
    assert!(review.body.contains("@ada"));
    assert!(review.body.contains("Build agents, Follow the research"));

    let response = app.post("/onboarding/finish", &[]).await;
    assert_eq!(response.redirect_target(), "/");
    let home = app.follow(&response).await;
    assert_eq!(home.status, StatusCode::OK);
    assert!(home.body.contains("Onboarding complete!"));

    let doc = app.documents.snapshot(USERS_COLLECTION, "user-1").unwrap();
    assert_eq!(doc["onboardingComplete"], json!(true));
    assert_eq!(doc["fullName"], json!("Ada Lovelace"));
    assert_eq!(doc["username"], json!("ada"));
    assert_eq!(doc["role"], json!("engineer"));
    assert_eq!(doc["teamSize"], json!("2-10"));
    assert_eq!(doc["intent"], json!(["build_agents", "research"]));
    assert_eq!(doc["priority"], json!("reliability"));
    assert!(doc["updatedAt"].is_string());

    assert_eq!(app.get("/onboarding").await.redirect_target(), "/");
}

#[tokio::test]
async fn test_finish_merges_onto_existing_document() {
    let app = signed_up().await;
    seed(&app, "user-1", &json!({ "plan": "beta" }));

    complete_identity(&app, "ada").await;
    answer_choices(&app).await;
    app.post("/onboarding/finish", &[]).await;

    let doc = app.documents.snapshot(USERS_COLLECTION, "user-1").unwrap();
    assert_eq!(doc["plan"], json!("beta"));
    assert_eq!(doc["onboardingComplete"], json!(true));
}

#[tokio::test]
async fn test_finish_failure_keeps_answers_for_retry() {
    let app = signed_up().await;
    complete_identity(&app, "ada").await;
    answer_choices(&app).await;

    // The guard's status read and its retry fail first, then the write.
    app.documents.fail_next(3);
    let response = app.post("/onboarding/finish", &[]).await;
    assert_eq!(response.redirect_target(), "/onboarding");

    let page = app.follow(&response).await;
    assert!(page.body.contains("Step 9 of 9"));
    assert!(page.body.contains("Please try again."));
    assert!(app.documents.snapshot(USERS_COLLECTION, "user-1").is_none());

    let response = app.post("/onboarding/finish", &[]).await;
    assert_eq!(response.redirect_target(), "/");
}

#[tokio::test]
async fn test_profile_load_failure_is_bad_gateway() {
    let app = signed_up().await;

    // Guard read, guard retry, then the wizard's profile read.
    app.documents.fail_next(3);
    let page = app.get("/onboarding").await;
    assert_eq!(page.status, StatusCode::BAD_GATEWAY);
    assert_eq!(page.body, "External service error");

    assert!(app.get("/onboarding").await.body.contains("Step 1 of 9"));
}

// =============================================================================
// Step 1
// =============================================================================

#[tokio::test]
async fn test_full_name_prefilled_from_display_name() {
    let app = signed_up().await;

    let page = app.get("/onboarding").await;

    assert!(page.body.contains("value=\"Ada Lovelace\""));
}

#[tokio::test]
async fn test_taken_username_blocks_advance() {
    let app = signed_up().await;
    seed(&app, "someone-else", &json!({ "username": "ada" }));

    let fragment = app.get("/onboarding/username?username=Ada").await;
    assert_eq!(fragment.status, StatusCode::OK);
    assert!(fragment.body.contains("data-availability=\"taken\""));

    complete_identity(&app, "ada").await;
    let page = app.get("/onboarding").await;
    assert!(page.body.contains("Step 1 of 9"));
    assert!(page.body.contains("pick an available username"));

    complete_identity(&app, "ada_l").await;
    assert!(app.get("/onboarding").await.body.contains("Step 2 of 9"));
}

#[tokio::test]
async fn test_username_input_is_normalized() {
    let app = signed_up().await;

    let fragment = app.get("/onboarding/username?username=Ada%20L!").await;

    assert!(fragment.body.contains("@adal"));
    assert!(fragment.body.contains("data-availability=\"available\""));
}

#[tokio::test]
async fn test_availability_query_per_keystroke_from_three_characters() {
    let app = signed_up().await;
    app.get("/onboarding").await;

    app.get("/onboarding/username?username=a").await;
    app.get("/onboarding/username?username=ab").await;
    assert_eq!(app.documents.query_count(), 0);

    app.get("/onboarding/username?username=abc").await;
    assert_eq!(app.documents.query_count(), 1);
    app.get("/onboarding/username?username=abcd").await;
    assert_eq!(app.documents.query_count(), 2);
    app.get("/onboarding/username?username=abcde").await;
    assert_eq!(app.documents.query_count(), 3);
}

#[tokio::test]
async fn test_overlong_username_says_so() {
    let app = signed_up().await;

    let page = app.get("/onboarding").await;
    assert!(page.body.contains("maxlength=\"30\""));

    let long = "a".repeat(31);
    let fragment = app
        .get(&format!("/onboarding/username?username={long}"))
        .await;
    assert!(fragment.body.contains("at most 30 characters"));
    assert_eq!(app.documents.query_count(), 0);
}

#[tokio::test]
async fn test_stored_username_is_locked() {
    let app = signed_up().await;
    seed(
        &app,
        "user-1",
        &json!({ "fullName": "Ada King", "username": "ada" }),
    );

    let page = app.get("/onboarding").await;
    assert!(page.body.contains("value=\"Ada King\""));
    assert!(page.body.contains("readonly"));

    let fragment = app.get("/onboarding/username?username=other").await;
    assert!(fragment.body.contains("data-locked=\"true\""));
    assert_eq!(app.documents.query_count(), 0);
}

// =============================================================================
// Choice Steps
// =============================================================================

#[tokio::test]
async fn test_intent_limit() {
    let app = signed_up().await;
    complete_identity(&app, "ada").await;
    app.post("/onboarding/select", &[("value", "engineer")]).await;
    app.post("/onboarding/select", &[("value", "solo")]).await;

    for intent in ["build_agents", "research", "evaluate"] {
        app.post("/onboarding/intent", &[("intent", intent)]).await;
    }
    let response = app.post("/onboarding/intent", &[("intent", "explore")]).await;
    let page = app.follow(&response).await;

    assert!(page.body.contains("You can pick up to 3."));
    assert!(page.body.contains("(3 selected)"));
}

#[tokio::test]
async fn test_continue_requires_an_intent() {
    let app = signed_up().await;
    complete_identity(&app, "ada").await;
    app.post("/onboarding/select", &[("value", "engineer")]).await;
    app.post("/onboarding/select", &[("value", "solo")]).await;

    let response = app.post("/onboarding/next", &[]).await;
    let page = app.follow(&response).await;

    assert!(page.body.contains("Please complete this step first."));
    assert!(page.body.contains("Step 4 of 9"));
}

#[tokio::test]
async fn test_back_keeps_answers() {
    let app = signed_up().await;
    complete_identity(&app, "ada").await;
    app.post("/onboarding/select", &[("value", "researcher")]).await;

    app.post("/onboarding/back", &[]).await;
    let page = app.get("/onboarding").await;

    assert!(page.body.contains("Step 2 of 9"));
    assert!(page.body.contains("choice choice-selected"));
}

#[tokio::test]
async fn test_unknown_choice_is_rejected() {
    let app = signed_up().await;
    complete_identity(&app, "ada").await;

    let response = app.post("/onboarding/select", &[("value", "astronaut")]).await;
    let page = app.follow(&response).await;

    assert!(page.body.contains("Step 2 of 9"));
    assert!(page.body.contains("toast-error"));
}

#[tokio::test]
async fn test_finish_before_review_does_nothing() {
    let app = signed_up().await;
    complete_identity(&app, "ada").await;

    let response = app.post("/onboarding/finish", &[]).await;

    assert_eq!(response.redirect_target(), "/onboarding");
    assert!(app.documents.snapshot(USERS_COLLECTION, "user-1").is_none());
}

#[tokio::test]
async fn test_wizard_is_discarded_on_logout() {
    let app = signed_up().await;
    complete_identity(&app, "ada").await;
    app.post("/onboarding/select", &[("value", "engineer")]).await;

    app.post("/auth/logout", &[]).await;
    app.settle().await;
    app.signin("ada@example.com").await;

    assert!(app.get("/onboarding").await.body.contains("Step 1 of 9"));
}
