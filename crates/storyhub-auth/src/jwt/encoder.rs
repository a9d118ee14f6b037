//! Credential minting.

use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};

use storyhub_core::config::AuthConfig;
use storyhub_core::error::AppError;
use storyhub_core::result::AppResult;
use storyhub_core::types::id::UserId;

use super::claims::Claims;

/// Signs HS256 credentials with the shared secret.
#[derive(Clone)]
pub struct JwtEncoder {
    encoding_key: EncodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder").field("ttl", &self.ttl).finish()
    }
}

impl JwtEncoder {
    pub fn new(config: &AuthConfig) -> Self {
        let seconds = i64::try_from(config.token_ttl_seconds).unwrap_or(i64::MAX);
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl: Duration::try_seconds(seconds).unwrap_or(Duration::days(1)),
        }
    }

    /// Issues a credential valid for the configured TTL.
    pub fn issue(&self, user_id: UserId, username: &str) -> AppResult<String> {
        self.issue_with_ttl(user_id, username, self.ttl)
    }

    /// Issues a credential valid for `ttl`.
    pub fn issue_with_ttl(&self, user_id: UserId, username: &str, ttl: Duration) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode credential: {e}")))
    }
}
