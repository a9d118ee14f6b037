//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use storyhub_auth::jwt::JwtDecoder;
use storyhub_core::config::AppConfig;
use storyhub_realtime::{CollabEngine, WsAuthenticator};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped or cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Collaboration engine (store, connections, broadcast groups)
    pub engine: Arc<CollabEngine>,
    /// Bearer credential verification for HTTP routes
    pub jwt_decoder: Arc<JwtDecoder>,
    /// Credential verification for WebSocket handshakes
    pub authenticator: WsAuthenticator,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: AppConfig, engine: Arc<CollabEngine>) -> Self {
        let jwt_decoder = Arc::new(JwtDecoder::new(&config.auth));
        Self {
            authenticator: WsAuthenticator::new(Arc::clone(&jwt_decoder)),
            jwt_decoder,
            engine,
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }
}
