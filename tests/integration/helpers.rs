//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tower::ServiceExt;

use storyhub_api::{AppState, build_app};
use storyhub_auth::jwt::JwtEncoder;
use storyhub_core::config::{AppConfig, CollabConfig};
use storyhub_core::types::id::{SessionId, UserId};
use storyhub_database::SessionStore;
use storyhub_realtime::CollabEngine;

const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Engine behind the router
    pub engine: Arc<CollabEngine>,
    /// Application config
    pub config: AppConfig,
    /// Address the router is served on
    pub addr: SocketAddr,
    encoder: JwtEncoder,
}

impl TestApp {
    /// Create a new test application on the in-memory store
    pub async fn new() -> Self {
        Self::with_collab(CollabConfig::default()).await
    }

    /// Create a test application with custom engine limits
    pub async fn with_collab(collab: CollabConfig) -> Self {
        let mut config = AppConfig::default();
        config.collab = collab;
        config.auth.jwt_secret = "integration-test-secret".to_string();

        let engine = Arc::new(CollabEngine::new(
            SessionStore::memory(),
            config.collab.clone(),
        ));
        let router = build_app(AppState::new(config.clone(), Arc::clone(&engine)));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("No local address");
        let served = router.clone();
        tokio::spawn(async move {
            axum::serve(listener, served)
                .await
                .expect("Test server failed");
        });

        Self {
            router,
            engine,
            encoder: JwtEncoder::new(&config.auth),
            config,
            addr,
        }
    }

    /// Mint a bearer credential for `username`
    pub fn token(&self, user_id: UserId, username: &str) -> String {
        self.encoder
            .issue(user_id, username)
            .expect("Failed to issue token")
    }

    /// New user id plus a credential for it
    pub fn user(&self, username: &str) -> (UserId, String) {
        let id = UserId::new();
        (id, self.token(id, username))
    }

    /// Make an HTTP request to the test app
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }

    /// Create a session through the lobby; returns its id and join code
    pub async fn create_session(&self, token: &str, body: Value) -> (SessionId, String) {
        let response = self.request("POST", "/api/sessions", Some(body), Some(token)).await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        let data = &response.body["data"];
        let id = data["session_id"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .expect("No session_id in response");
        let code = data["join_code"]
            .as_str()
            .expect("No join_code in response")
            .to_string();
        (id, code)
    }

    /// Join a session by code through the lobby
    pub async fn join(&self, token: &str, code: &str) -> TestResponse {
        self.request(
            "POST",
            "/api/sessions/join",
            Some(serde_json::json!({ "join_code": code })),
            Some(token),
        )
        .await
    }

    fn ws_url(&self, session: &str) -> String {
        format!("ws://{}/ws/collaborate/{}", self.addr, session)
    }

    /// Open a collaboration socket with `?token=`
    pub async fn connect(&self, session_id: SessionId, token: Option<&str>) -> WsClient {
        let mut url = self.ws_url(&session_id.to_string());
        if let Some(token) = token {
            url = format!("{url}?token={token}");
        }
        self.connect_url(&url).await
    }

    /// Open a collaboration socket against a raw path segment
    pub async fn connect_url(&self, url: &str) -> WsClient {
        let (stream, _) = connect_async(url).await.expect("WebSocket connect failed");
        WsClient { stream }
    }

    /// Open a collaboration socket with an `Authorization: Bearer` header
    pub async fn connect_with_header(&self, session_id: SessionId, token: &str) -> WsClient {
        let mut req = self
            .ws_url(&session_id.to_string())
            .into_client_request()
            .expect("Bad WebSocket request");
        req.headers_mut().insert(
            "Authorization",
            format!("Bearer {token}").parse().expect("Bad header"),
        );
        let (stream, _) = connect_async(req).await.expect("WebSocket connect failed");
        WsClient { stream }
    }

    /// Raw path helper for malformed ids
    pub fn raw_ws_url(&self, session: &str, token: &str) -> String {
        format!("{}?token={}", self.ws_url(session), token)
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

/// A real WebSocket client driving the server.
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

/// What the server eventually did with the socket.
#[derive(Debug)]
pub enum Incoming {
    Frame(Value),
    Closed(Option<(u16, String)>),
}

impl WsClient {
    /// Send a JSON frame
    pub async fn send(&mut self, frame: Value) {
        self.stream
            .send(Message::text(frame.to_string()))
            .await
            .expect("WebSocket send failed");
    }

    /// Send a raw text frame
    pub async fn send_raw(&mut self, text: &str) {
        self.stream
            .send(Message::text(text.to_string()))
            .await
            .expect("WebSocket send failed");
    }

    /// Next JSON frame or close
    pub async fn next(&mut self) -> Incoming {
        loop {
            let msg = tokio::time::timeout(READ_TIMEOUT, self.stream.next())
                .await
                .expect("Timed out waiting for a frame");
            match msg {
                Some(Ok(Message::Text(text))) => {
                    let value = serde_json::from_str(text.as_str()).expect("Non-JSON frame");
                    return Incoming::Frame(value);
                }
                Some(Ok(Message::Close(frame))) => {
                    return Incoming::Closed(
                        frame.map(|f| (u16::from(f.code), f.reason.as_str().to_string())),
                    );
                }
                Some(Ok(_)) => continue,
                Some(Err(_)) | None => return Incoming::Closed(None),
            }
        }
    }

    /// Read frames until one of type `kind` arrives
    pub async fn expect_type(&mut self, kind: &str) -> Value {
        loop {
            match self.next().await {
                Incoming::Frame(frame) if frame["type"] == kind => return frame,
                Incoming::Frame(_) => continue,
                Incoming::Closed(close) => {
                    panic!("Socket closed with {close:?} while waiting for {kind}")
                }
            }
        }
    }

    /// Read frames until the server closes; returns the close code
    pub async fn expect_close(&mut self) -> u16 {
        loop {
            match self.next().await {
                Incoming::Frame(_) => continue,
                Incoming::Closed(Some((code, _))) => return code,
                Incoming::Closed(None) => panic!("Socket dropped without a close frame"),
            }
        }
    }

    /// Close from the client side
    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}
