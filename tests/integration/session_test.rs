//! Integration tests for the session lobby and health routes.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

use storyhub_core::config::CollabConfig;

use helpers::TestApp;

#[tokio::test]
async fn test_lobby_requires_credentials() {
    let app = TestApp::new().await;

    let response = app.request("POST", "/api/sessions", Some(json!({})), None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "AUTHENTICATION");

    let response = app
        .request("GET", "/api/sessions", None, Some("forged.token.value"))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_session_returns_join_code() {
    let app = TestApp::new().await;
    let (host_id, token) = app.user("maya");

    let response = app
        .request(
            "POST",
            "/api/sessions",
            Some(json!({ "title": "  Moon Trip ", "pages": ["Once", "Upon"] })),
            Some(&token),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    let data = &response.body["data"];
    assert_eq!(data["host_id"], host_id.to_string());
    assert_eq!(data["title"], "Moon Trip");
    assert_eq!(data["page_count"], 2);
    assert_eq!(data["is_lobby_open"], true);
    assert!(data["join_code"].as_str().is_some_and(|c| !c.is_empty()));
}

#[tokio::test]
async fn test_join_is_case_insensitive_and_idempotent() {
    let app = TestApp::new().await;
    let (_, host_token) = app.user("maya");
    let (_, guest_token) = app.user("leo");
    let (session_id, code) = app.create_session(&host_token, json!({})).await;

    let first = app.join(&guest_token, &code.to_lowercase()).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["data"]["session_id"], session_id.to_string());

    let again = app.join(&guest_token, &code).await;
    assert_eq!(again.status, StatusCode::OK);

    let listed = app.request("GET", "/api/sessions", None, Some(&guest_token)).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body["data"]["participated"].as_array().map(Vec::len), Some(1));
    assert_eq!(listed.body["data"]["hosted"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_unknown_join_code_is_not_found() {
    let app = TestApp::new().await;
    let (_, token) = app.user("leo");

    let response = app.join(&token, "ZZZZZZ").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "NOT_FOUND");

    let response = app.join(&token, "").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_full_session_refuses_joins() {
    let app = TestApp::with_collab(CollabConfig {
        max_participants: 2,
        ..CollabConfig::default()
    })
    .await;
    let (_, host_token) = app.user("maya");
    let (_, leo) = app.user("leo");
    let (_, ada) = app.user("ada");
    let (_, code) = app.create_session(&host_token, json!({})).await;

    assert_eq!(app.join(&leo, &code).await.status, StatusCode::OK);
    let response = app.join(&ada, &code).await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.body["error"], "CAPACITY");
}

#[tokio::test]
async fn test_start_is_host_only_and_closes_lobby() {
    let app = TestApp::new().await;
    let (_, host_token) = app.user("maya");
    let (_, guest_token) = app.user("leo");
    let (_, late_token) = app.user("ada");
    let (session_id, code) = app.create_session(&host_token, json!({})).await;
    app.join(&guest_token, &code).await;
    let start = format!("/api/sessions/{session_id}/start");

    let response = app.request("POST", &start, None, Some(&guest_token)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app.request("POST", &start, None, Some(&host_token)).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = app.request("POST", &start, None, Some(&host_token)).await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let response = app.join(&late_token, &code).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["error"], "SESSION");

    // Existing members still get back in.
    assert_eq!(app.join(&guest_token, &code).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_ended_session_rejects_lobby_actions() {
    let app = TestApp::new().await;
    let (_, host_token) = app.user("maya");
    let (_, guest_token) = app.user("leo");
    let (session_id, code) = app.create_session(&host_token, json!({})).await;
    let end = format!("/api/sessions/{session_id}/end");

    let response = app.request("POST", &end, None, Some(&guest_token)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app.request("POST", &end, None, Some(&host_token)).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    assert_eq!(app.join(&guest_token, &code).await.status, StatusCode::CONFLICT);

    let listed = app.request("GET", "/api/sessions", None, Some(&host_token)).await;
    assert_eq!(listed.body["data"]["hosted"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_oversized_seed_is_rejected() {
    let app = TestApp::with_collab(CollabConfig {
        max_pages: 2,
        ..CollabConfig::default()
    })
    .await;
    let (_, token) = app.user("maya");

    let response = app
        .request(
            "POST",
            "/api/sessions",
            Some(json!({ "pages": ["a", "b", "c"] })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "VALIDATION");
}

#[tokio::test]
async fn test_health_reports_store_and_metrics() {
    let app = TestApp::new().await;

    let response = app.request("GET", "/api/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["store"], "memory");
    assert_eq!(response.body["ws_connections"], 0);
    assert!(response.body["realtime"]["messages_received"].is_u64());
}
