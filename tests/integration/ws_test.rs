//! Integration tests for the collaboration WebSocket.

mod helpers;

use serde_json::json;

use storyhub_core::config::CollabConfig;
use storyhub_core::types::id::SessionId;

use helpers::{Incoming, TestApp};

#[tokio::test]
async fn test_ws_without_token_is_refused_with_4001() {
    let app = TestApp::new().await;
    let (_, host_token) = app.user("host");
    let (session_id, _) = app.create_session(&host_token, json!({})).await;

    let mut ws = app.connect(session_id, None).await;
    assert_eq!(ws.expect_close().await, 4001);

    let mut ws = app.connect(session_id, Some("not-a-jwt")).await;
    assert_eq!(ws.expect_close().await, 4001);
}

#[tokio::test]
async fn test_unknown_or_malformed_session_is_refused_with_4004() {
    let app = TestApp::new().await;
    let (_, token) = app.user("wanderer");

    let mut ws = app.connect(SessionId::new(), Some(&token)).await;
    assert_eq!(ws.expect_close().await, 4004);

    let mut ws = app.connect_url(&app.raw_ws_url("not-a-uuid", &token)).await;
    assert_eq!(ws.expect_close().await, 4004);
}

#[tokio::test]
async fn test_host_receives_init_snapshot() {
    let app = TestApp::new().await;
    let (host_id, host_token) = app.user("maya");
    let (session_id, _) = app
        .create_session(&host_token, json!({ "title": "Moon Trip", "pages": ["Once"] }))
        .await;

    let mut host = app.connect(session_id, Some(&host_token)).await;
    let init = host.expect_type("init").await;

    assert_eq!(init["is_host"], true);
    assert_eq!(init["current_user_id"], host_id.to_string());
    assert_eq!(init["current_username"], "maya");
    assert_eq!(init["story_draft"]["title"], "Moon Trip");
    assert_eq!(init["participants"].as_array().map(Vec::len), Some(1));
    assert!(init["your_color"].as_str().is_some_and(|c| c.starts_with('#')));
}

#[tokio::test]
async fn test_bearer_header_is_accepted() {
    let app = TestApp::new().await;
    let (_, host_token) = app.user("maya");
    let (session_id, _) = app.create_session(&host_token, json!({})).await;

    let mut host = app.connect_with_header(session_id, &host_token).await;
    let init = host.expect_type("init").await;
    assert_eq!(init["is_host"], true);
}

#[tokio::test]
async fn test_edits_reach_peers_but_not_the_sender() {
    let app = TestApp::new().await;
    let (_, host_token) = app.user("maya");
    let (guest_id, guest_token) = app.user("leo");
    let (session_id, code) = app.create_session(&host_token, json!({})).await;
    assert!(app.join(&guest_token, &code).await.status.is_success());

    let mut host = app.connect(session_id, Some(&host_token)).await;
    host.expect_type("init").await;
    let mut guest = app.connect(session_id, Some(&guest_token)).await;
    guest.expect_type("init").await;

    let joined = host.expect_type("user_joined").await;
    assert_eq!(joined["user_id"], guest_id.to_string());

    guest
        .send(json!({ "type": "text_edit", "page_index": 0, "text": "A fox" }))
        .await;
    let edit = host.expect_type("text_edit").await;
    assert_eq!(edit["text"], "A fox");
    assert_eq!(edit["user_id"], guest_id.to_string());
    assert_eq!(edit["sequence_number"], 0);

    guest.send(json!({ "type": "page_change", "page_number": 0 })).await;
    match guest.next().await {
        Incoming::Frame(frame) => assert_eq!(frame["type"], "page_change"),
        Incoming::Closed(close) => panic!("Unexpected close {close:?}"),
    }
}

#[tokio::test]
async fn test_invalid_frame_gets_private_error() {
    let app = TestApp::new().await;
    let (_, host_token) = app.user("maya");
    let (session_id, _) = app.create_session(&host_token, json!({})).await;

    let mut host = app.connect(session_id, Some(&host_token)).await;
    host.expect_type("init").await;

    host.send_raw("{not json").await;
    let error = host.expect_type("error").await;
    assert_eq!(error["code"], "VALIDATION");

    host.send(json!({ "type": "teleport" })).await;
    let error = host.expect_type("error").await;
    assert_eq!(error["code"], "VALIDATION");
}

#[tokio::test]
async fn test_guest_leaving_is_announced() {
    let app = TestApp::new().await;
    let (_, host_token) = app.user("maya");
    let (guest_id, guest_token) = app.user("leo");
    let (session_id, code) = app.create_session(&host_token, json!({})).await;
    app.join(&guest_token, &code).await;

    let mut host = app.connect(session_id, Some(&host_token)).await;
    host.expect_type("init").await;
    let mut guest = app.connect(session_id, Some(&guest_token)).await;
    guest.expect_type("init").await;
    host.expect_type("user_joined").await;

    guest.close().await;
    let left = host.expect_type("user_left").await;
    assert_eq!(left["user_id"], guest_id.to_string());
    assert_eq!(left["is_host"], false);
    assert_eq!(left["temporary"], false);
}

#[tokio::test]
async fn test_kicked_user_is_closed_and_cannot_return() {
    let app = TestApp::new().await;
    let (_, host_token) = app.user("maya");
    let (guest_id, guest_token) = app.user("leo");
    let (session_id, code) = app.create_session(&host_token, json!({})).await;
    app.join(&guest_token, &code).await;

    let mut host = app.connect(session_id, Some(&host_token)).await;
    host.expect_type("init").await;
    let mut guest = app.connect(session_id, Some(&guest_token)).await;
    guest.expect_type("init").await;

    host.send(json!({ "type": "kick_user", "user_id": guest_id })).await;
    let kicked = guest.expect_type("user_kicked").await;
    assert_eq!(kicked["kicked_user_id"], guest_id.to_string());
    assert_eq!(guest.expect_close().await, 4005);

    let mut again = app.connect(session_id, Some(&guest_token)).await;
    assert_eq!(again.expect_close().await, 4005);
}

#[tokio::test]
async fn test_connection_cap_refuses_with_4002() {
    let app = TestApp::with_collab(CollabConfig {
        max_connections_per_session: 1,
        ..CollabConfig::default()
    })
    .await;
    let (_, host_token) = app.user("maya");
    let (session_id, _) = app.create_session(&host_token, json!({})).await;

    let mut first = app.connect(session_id, Some(&host_token)).await;
    first.expect_type("init").await;

    let mut second = app.connect(session_id, Some(&host_token)).await;
    assert_eq!(second.expect_close().await, 4002);
}

#[tokio::test]
async fn test_host_ending_session_closes_everyone() {
    let app = TestApp::new().await;
    let (_, host_token) = app.user("maya");
    let (_, guest_token) = app.user("leo");
    let (session_id, code) = app.create_session(&host_token, json!({})).await;
    app.join(&guest_token, &code).await;

    let mut guest = app.connect(session_id, Some(&guest_token)).await;
    guest.expect_type("init").await;

    let response = app
        .request(
            "POST",
            &format!("/api/sessions/{session_id}/end"),
            None,
            Some(&host_token),
        )
        .await;
    assert!(response.status.is_success());

    let ended = guest.expect_type("session_ended").await;
    assert_eq!(ended["ended_by"], "host");
    assert_eq!(guest.expect_close().await, 1000);

    let mut late = app.connect(session_id, Some(&guest_token)).await;
    assert_eq!(late.expect_close().await, 4003);
}

#[tokio::test]
async fn test_vote_and_finalize_over_the_wire() {
    let app = TestApp::new().await;
    let (host_id, host_token) = app.user("maya");
    let (_, guest_token) = app.user("leo");
    let (session_id, code) = app
        .create_session(&host_token, json!({ "title": "Moon Trip" }))
        .await;
    app.join(&guest_token, &code).await;

    let mut host = app.connect(session_id, Some(&host_token)).await;
    host.expect_type("init").await;
    let mut guest = app.connect(session_id, Some(&guest_token)).await;
    guest.expect_type("init").await;

    host.send(json!({ "type": "initiate_vote" })).await;
    let initiated = guest.expect_type("vote_initiated").await;
    assert_eq!(initiated["required_votes"], 2);

    host.send(json!({ "type": "vote_save", "vote": true })).await;
    guest.send(json!({ "type": "vote_save", "vote": true })).await;
    let result = host.expect_type("vote_result").await;
    assert_eq!(result["approved"], true);
    assert_eq!(result["initiated_by"], host_id.to_string());

    host.send(json!({
        "type": "finalize_collaborative_story",
        "genres": ["Adventure"],
    }))
    .await;
    let finalized = guest.expect_type("story_finalized").await;
    assert_eq!(finalized["title"], "Moon Trip");
    assert_eq!(guest.expect_close().await, 1000);
    assert_eq!(host.expect_close().await, 1000);
    assert_eq!(app.engine.metrics().stories_finalized, 1);
}
